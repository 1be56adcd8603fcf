//! Shared types, error model, date normalization, and configuration for Seedbank.
//!
//! This crate is the foundation depended on by all other Seedbank crates.
//! It provides:
//! - [`SeedError`]: the unified error type
//! - Domain types ([`SeedRecord`], [`ParagraphBlock`], [`ParagraphKind`])
//! - [`DateNormalizer`] for ordinal display dates
//! - Configuration ([`AppConfig`], [`ScrapeConfig`], config loading)

pub mod config;
pub mod dates;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ScrapeConfig, SourceConfig, config_dir, config_file_path,
    expand_home, init_config, load_config, load_config_from,
};
pub use dates::{DEFAULT_TIME_ZONE, DateNormalizer, month_number, ordinal_day, resolve_time_zone};
pub use error::{Result, SeedError};
pub use types::{ParagraphBlock, ParagraphKind, SeedRecord};
