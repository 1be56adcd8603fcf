//! Application configuration for Seedbank.
//!
//! User config lives at `~/.seedbank/seedbank.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::dates::{DEFAULT_TIME_ZONE, resolve_time_zone};
use crate::error::{Result, SeedError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "seedbank.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".seedbank";

// ---------------------------------------------------------------------------
// Config structs (matching seedbank.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote content source.
    #[serde(default)]
    pub source: SourceConfig,

    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Site root; relative hrefs found on the index are resolved against it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the category listing that links recent seeds.
    #[serde(default = "default_category_path")]
    pub category_path: String,

    /// Per-request timeout for every outbound fetch.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            category_path: default_category_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://www.dunamisgospel.org".into()
}
fn default_category_path() -> String {
    "/index.php/component/k2/itemlist/category/3".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// IANA zone identifier all dates are constructed in.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    /// Number of days returned by a lookahead request.
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: u32,

    /// Database location; a leading `~` expands to the home directory.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            time_zone: default_time_zone(),
            lookahead_days: default_lookahead_days(),
            database_path: default_database_path(),
        }
    }
}

fn default_time_zone() -> String {
    DEFAULT_TIME_ZONE.into()
}
fn default_lookahead_days() -> u32 {
    3
}
fn default_database_path() -> String {
    "~/.seedbank/seedbank.db".into()
}

// ---------------------------------------------------------------------------
// Scrape config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime scrape configuration with the time zone already resolved.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Site root for resolving discovered links.
    pub base_url: String,
    /// Category listing path.
    pub category_path: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Reference zone for every date.
    pub zone: Tz,
    /// Default lookahead length.
    pub lookahead_days: u32,
}

impl ScrapeConfig {
    /// Parsed site root.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| SeedError::config(format!("invalid base_url {:?}: {e}", self.base_url)))
    }

    /// Absolute URL of the category listing.
    pub fn index_url(&self) -> Result<Url> {
        self.base_url()?.join(&self.category_path).map_err(|e| {
            SeedError::config(format!("invalid category_path {:?}: {e}", self.category_path))
        })
    }
}

impl From<&AppConfig> for ScrapeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.source.base_url.clone(),
            category_path: config.source.category_path.clone(),
            timeout_secs: config.source.timeout_secs,
            zone: resolve_time_zone(&config.defaults.time_zone),
            lookahead_days: config.defaults.lookahead_days,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.seedbank/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| SeedError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.seedbank/seedbank.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SeedError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SeedError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SeedError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| SeedError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SeedError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| SeedError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("Africa/Lagos"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.lookahead_days, 3);
        assert_eq!(parsed.source.timeout_secs, 30);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[source]
base_url = "http://localhost:8080"

[defaults]
time_zone = "Europe/London"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.source.base_url, "http://localhost:8080");
        assert_eq!(
            config.source.category_path,
            "/index.php/component/k2/itemlist/category/3"
        );
        assert_eq!(config.defaults.lookahead_days, 3);
    }

    #[test]
    fn scrape_config_from_app_config() {
        let app = AppConfig::default();
        let scrape = ScrapeConfig::from(&app);
        assert_eq!(scrape.zone, chrono_tz::Africa::Lagos);
        assert_eq!(scrape.timeout_secs, 30);
        assert_eq!(
            scrape.index_url().unwrap().as_str(),
            "http://www.dunamisgospel.org/index.php/component/k2/itemlist/category/3"
        );
    }

    #[test]
    fn bad_zone_resolves_to_utc() {
        let mut app = AppConfig::default();
        app.defaults.time_zone = "Nowhere/Special".into();
        assert_eq!(ScrapeConfig::from(&app).zone, chrono_tz::UTC);
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let mut app = AppConfig::default();
        app.source.base_url = "not a url".into();
        let err = ScrapeConfig::from(&app).index_url().unwrap_err();
        assert!(err.to_string().contains("invalid base_url"));
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(
            expand_home("/var/lib/seedbank.db").unwrap(),
            PathBuf::from("/var/lib/seedbank.db")
        );
        assert!(expand_home("~/x.db").unwrap().ends_with("x.db"));
    }
}
