//! Seed acquisition for Seedbank.
//!
//! This crate ties together link discovery, content extraction, and storage
//! into the cache-then-scrape lookup served by [`SeedService`].

pub mod acquisition;
pub mod progress;

pub use acquisition::{Lookahead, ScrapeReport, SeedService};
pub use progress::{ProgressReporter, SilentProgress};
