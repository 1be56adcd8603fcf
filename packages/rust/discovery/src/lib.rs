//! Seed link discovery from the category listing page.
//!
//! Before any detail page is scraped, the listing of recently published seeds
//! is fetched once and reduced to `(title, href)` pairs. Parsing is a pure
//! function over the fetched document (see [`parse_links`]).

mod parser;

use std::time::Duration;

use reqwest::Client;
use scraper::Html;
use seedbank_shared::{Result, SeedError};
use tracing::{debug, info, instrument};
use url::Url;

pub use parser::{SeedLink, parse_links};

/// Maximum number of redirects to follow when fetching the listing.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for fetching the listing.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for discovery requests.
const USER_AGENT: &str = concat!("Seedbank/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Configuration for the discovery process.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// LinkDiscovery
// ---------------------------------------------------------------------------

/// Fetches the category listing and extracts seed links from it.
#[derive(Debug, Clone)]
pub struct LinkDiscovery {
    client: Client,
    index_url: Url,
}

impl LinkDiscovery {
    /// Create a discovery client for the listing at `index_url`.
    pub fn new(index_url: Url, opts: &DiscoveryOptions) -> Result<Self> {
        Ok(Self {
            client: build_client(opts)?,
            index_url,
        })
    }

    /// The listing URL this instance visits.
    pub fn index_url(&self) -> &Url {
        &self.index_url
    }

    /// Fetch the listing and return its links in page order.
    ///
    /// Any transport failure or non-success status is reported as a single
    /// [`SeedError::Fetch`] naming the listing URL.
    #[instrument(skip_all, fields(url = %self.index_url))]
    pub async fn discover_links(&self) -> Result<Vec<SeedLink>> {
        info!("fetching seed listing");

        let body = fetch_html(&self.client, &self.index_url).await?;
        let doc = Html::parse_document(&body);
        let links = parse_links(&doc);

        info!(links = links.len(), "seed links discovered");
        Ok(links)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &DiscoveryOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| SeedError::Fetch(format!("failed to build HTTP client: {e}")))
}

/// Fetch a URL and return its body as text.
async fn fetch_html(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "fetching page");

    let response = client
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
        .map_err(|e| SeedError::Fetch(format!("{url}: failed to read body: {e}")))
}
