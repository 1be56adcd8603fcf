//! Progress reporting hooks for scrape passes.

use crate::acquisition::ScrapeReport;

/// Progress callback for reporting scrape status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each discovered link has been handled, successfully or not.
    fn link_processed(&self, title: &str, current: usize, total: usize);
    /// Called when a scrape pass completes.
    fn done(&self, report: &ScrapeReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn link_processed(&self, _title: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &ScrapeReport) {}
}
