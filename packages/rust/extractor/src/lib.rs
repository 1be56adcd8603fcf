//! Seed detail page fetching and positional content extraction.
//!
//! This crate provides:
//! - [`text_blocks`]: ordered non-blank text blocks of a parsed detail page
//! - [`FIELD_MAP`] / [`build_record`]: positional block → field mapping
//! - [`ContentExtractor`]: fetches a detail page and builds a [`SeedRecord`]

mod blocks;
mod fields;

use std::time::Duration;

use reqwest::Client;
use scraper::Html;
use seedbank_shared::{DateNormalizer, Result, SeedError, SeedRecord};
use tracing::{debug, info, instrument};
use url::Url;

pub use blocks::text_blocks;
pub use fields::{FIELD_MAP, SeedField, build_record, field_at};

/// User-Agent string for detail page requests.
const USER_AGENT: &str = concat!("Seedbank/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow when fetching a detail page.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for fetching a detail page.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Options for the extractor's HTTP client.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// ContentExtractor
// ---------------------------------------------------------------------------

/// Fetches seed detail pages and extracts records from them.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    client: Client,
    normalizer: DateNormalizer,
}

impl ContentExtractor {
    /// Create an extractor that normalizes dates with `normalizer`.
    pub fn new(normalizer: DateNormalizer, opts: &ExtractOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| SeedError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, normalizer })
    }

    /// Fetch the page at `url` and extract a record titled `title`.
    ///
    /// A transport failure aborts with [`SeedError::Fetch`]. A date block
    /// that fails to normalize does not; the record comes back with an
    /// empty date instead.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn extract(&self, url: &Url, title: &str) -> Result<SeedRecord> {
        let body = self.fetch(url).await?;
        let doc = Html::parse_document(&body);
        let blocks = text_blocks(&doc);
        let seed = build_record(title, &blocks, &self.normalizer);

        info!(
            blocks = blocks.len(),
            day = seed.day,
            month = seed.month,
            year = seed.year,
            "seed extracted"
        );
        Ok(seed)
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!(%url, "fetching seed page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| SeedError::Fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SeedError::Fetch(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| SeedError::Fetch(format!("{url}: body read failed: {e}")))
    }
}
