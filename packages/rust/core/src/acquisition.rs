//! Cache-then-scrape seed acquisition.
//!
//! A requested day is served from storage when present. On a miss, one
//! scrape pass runs over every link on the category listing, each result is
//! upserted by calendar day, and storage is asked once more.

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use seedbank_discovery::{DiscoveryOptions, LinkDiscovery, SeedLink};
use seedbank_extractor::{ContentExtractor, ExtractOptions};
use seedbank_shared::{DateNormalizer, Result, ScrapeConfig, SeedError, SeedRecord};
use seedbank_storage::Storage;

use crate::progress::{ProgressReporter, SilentProgress};

/// Outcome of one scrape pass, also stored as the job's stats.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeReport {
    /// Identifier of the `scrape_jobs` row for this pass.
    pub job_id: String,
    pub links_found: usize,
    pub stored: usize,
    pub failed: usize,
    /// Message of the last per-link failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Result of a multi-day lookahead.
///
/// `seeds` holds the consecutive days obtained before the first failure;
/// `error` is that failure, or `None` when every day was obtained.
#[derive(Debug, Default)]
pub struct Lookahead {
    pub seeds: Vec<SeedRecord>,
    pub error: Option<SeedError>,
}

impl Lookahead {
    /// True when no day failed.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// The full sequence, or the aborting error.
    pub fn into_result(self) -> Result<Vec<SeedRecord>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.seeds),
        }
    }
}

/// Scrape pass outcome plus the retained error, which is not serializable.
struct ScrapePass {
    report: ScrapeReport,
    last_error: Option<SeedError>,
}

/// Seed lookups backed by local storage and the remote listing.
pub struct SeedService {
    storage: Storage,
    discovery: LinkDiscovery,
    extractor: ContentExtractor,
    base_url: Url,
    progress: Box<dyn ProgressReporter>,
}

impl SeedService {
    /// Build a service over `storage` for the source described by `config`.
    pub fn new(storage: Storage, config: &ScrapeConfig) -> Result<Self> {
        let discovery = LinkDiscovery::new(
            config.index_url()?,
            &DiscoveryOptions {
                timeout_secs: config.timeout_secs,
            },
        )?;
        let extractor = ContentExtractor::new(
            DateNormalizer::new(config.zone),
            &ExtractOptions {
                timeout_secs: config.timeout_secs,
            },
        )?;

        Ok(Self {
            storage,
            discovery,
            extractor,
            base_url: config.base_url()?,
            progress: Box::new(SilentProgress),
        })
    }

    /// Report scrape progress to `progress` instead of discarding it.
    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// The underlying store.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Get a stored seed by ID. Never scrapes.
    pub async fn get(&self, id: i64) -> Result<SeedRecord> {
        self.storage
            .get_seed(id)
            .await?
            .ok_or(SeedError::RecordNotFound { id })
    }

    /// Get the seed for a calendar day, scraping the listing once on a miss.
    ///
    /// When the retry still misses, the last per-link error of the scrape
    /// pass is returned, or [`SeedError::NotFound`] if there was none. If the
    /// pass could not run at all the result is also `NotFound`.
    #[instrument(skip(self))]
    pub async fn get_by_day(&self, day: u32, month: u32, year: i32) -> Result<SeedRecord> {
        Self::calendar_day(day, month, year)?;

        if let Some(seed) = self.storage.get_seed_by_day(day, month, year).await? {
            debug!("seed served from storage");
            return Ok(seed);
        }

        info!("seed not stored, starting scrape pass");
        let not_found = SeedError::NotFound { day, month, year };
        let pending = match self.scrape_pass().await {
            Ok(pass) => pass.last_error,
            Err(e) => {
                warn!(error = %e, "scrape pass could not run");
                return Err(not_found);
            }
        };

        match self.storage.get_seed_by_day(day, month, year).await? {
            Some(seed) => Ok(seed),
            None => Err(pending.unwrap_or(not_found)),
        }
    }

    /// Get `count` consecutive days starting at the given day.
    ///
    /// Days are acquired one at a time; the first failure stops the batch
    /// and is returned alongside the days already obtained.
    #[instrument(skip(self))]
    pub async fn get_next(&self, day: u32, month: u32, year: i32, count: u32) -> Lookahead {
        let mut lookahead = Lookahead::default();

        let mut current = match Self::calendar_day(day, month, year) {
            Ok(date) => date,
            Err(e) => {
                lookahead.error = Some(e);
                return lookahead;
            }
        };

        for _ in 0..count {
            match self
                .get_by_day(current.day(), current.month(), current.year())
                .await
            {
                Ok(seed) => lookahead.seeds.push(seed),
                Err(e) => {
                    warn!(%current, error = %e, "lookahead stopped");
                    lookahead.error = Some(e);
                    break;
                }
            }

            current = match current.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => break,
            };
        }

        lookahead
    }

    /// Count stored seeds.
    pub async fn count(&self) -> Result<u64> {
        self.storage.count_seeds().await
    }

    /// Page through stored seeds in ID order.
    pub async fn query(&self, offset: u64, limit: u64) -> Result<Vec<SeedRecord>> {
        self.storage.query_seeds(offset, limit).await
    }

    /// Validate and overwrite the stored seed with ID `id`.
    pub async fn update(&self, id: i64, record: &SeedRecord) -> Result<()> {
        record.validate()?;
        self.storage.update_seed(id, record).await
    }

    // -----------------------------------------------------------------------
    // Scraping
    // -----------------------------------------------------------------------

    /// Run one scrape pass unconditionally.
    ///
    /// Fails only when the pass cannot run; per-link failures are counted in
    /// the report.
    pub async fn scrape(&self) -> Result<ScrapeReport> {
        Ok(self.scrape_pass().await?.report)
    }

    #[instrument(skip_all)]
    async fn scrape_pass(&self) -> Result<ScrapePass> {
        let job_id = self.storage.insert_scrape_job().await?;
        let mut report = ScrapeReport {
            job_id: job_id.clone(),
            ..ScrapeReport::default()
        };

        self.progress.phase("Discovering seed links");
        let links = match self.discovery.discover_links().await {
            Ok(links) => links,
            Err(e) => {
                report.last_error = Some(e.to_string());
                self.finish_job(&report).await;
                return Err(e);
            }
        };
        report.links_found = links.len();

        self.progress.phase("Extracting seeds");
        let mut last_error = None;
        for (i, link) in links.iter().enumerate() {
            match self.acquire_link(link).await {
                Ok(id) => {
                    debug!(id, title = %link.title, "seed stored");
                    report.stored += 1;
                }
                Err(e) => {
                    warn!(title = %link.title, href = %link.href, error = %e, "link failed");
                    report.failed += 1;
                    report.last_error = Some(e.to_string());
                    last_error = Some(e);
                }
            }
            self.progress.link_processed(&link.title, i + 1, links.len());
        }

        info!(
            links = report.links_found,
            stored = report.stored,
            failed = report.failed,
            "scrape pass complete"
        );
        self.finish_job(&report).await;
        self.progress.done(&report);

        Ok(ScrapePass { report, last_error })
    }

    /// Resolve, extract, validate, and upsert a single link.
    async fn acquire_link(&self, link: &SeedLink) -> Result<i64> {
        let url = link.resolve(&self.base_url)?;
        let seed = self.extractor.extract(&url, &link.title).await?;
        seed.validate()?;
        self.storage.create_seed(&seed).await
    }

    /// Record the pass's stats. A failure here does not fail the pass.
    async fn finish_job(&self, report: &ScrapeReport) {
        let stats = match serde_json::to_string(report) {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "could not serialize scrape stats");
                return;
            }
        };
        if let Err(e) = self.storage.finish_scrape_job(&report.job_id, &stats).await {
            warn!(job_id = %report.job_id, error = %e, "could not finish scrape job");
        }
    }

    /// Check that the day exists in the calendar.
    fn calendar_day(day: u32, month: u32, year: i32) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| SeedError::InvalidDay {
            token: format!("{day}/{month}/{year}"),
        })
    }
}
