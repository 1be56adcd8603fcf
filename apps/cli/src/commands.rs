//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use seedbank_core::{ProgressReporter, ScrapeReport, SeedService};
use seedbank_shared::{
    AppConfig, ScrapeConfig, SeedRecord, expand_home, init_config, load_config, month_number,
};
use seedbank_storage::Storage;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Seedbank: daily seeds, cached locally and scraped on demand.
#[derive(Parser)]
#[command(
    name = "seedbank",
    version,
    about = "Look up daily devotional seeds, scraping the source site on a local miss.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Database path (overrides `defaults.database_path`).
    #[arg(long, global = true, env = "SEEDBANK_DB")]
    pub db: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Get the seed for one day, scraping if it is not stored yet.
    Get {
        day: u32,
        /// Month number or English name.
        #[arg(value_parser = parse_month)]
        month: u32,
        year: i32,
    },

    /// Get consecutive seeds starting at a day.
    Next {
        day: u32,
        /// Month number or English name.
        #[arg(value_parser = parse_month)]
        month: u32,
        year: i32,

        /// Number of days (defaults to `defaults.lookahead_days`).
        #[arg(short, long)]
        count: Option<u32>,
    },

    /// Show a stored seed by ID.
    Show { id: i64 },

    /// List stored seeds.
    List {
        #[arg(long, default_value = "0")]
        offset: u64,

        #[arg(long, default_value = "20")]
        limit: u64,
    },

    /// Overwrite a stored seed with a JSON record.
    Update {
        id: i64,

        /// JSON file holding the record; reads stdin when omitted or `-`.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Run one scrape pass over the category listing.
    Scrape,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Accept a month as `8` or `august`.
fn parse_month(value: &str) -> std::result::Result<u32, String> {
    if let Ok(number) = value.parse::<u32>() {
        return match number {
            1..=12 => Ok(number),
            _ => Err(format!("month out of range: {number}")),
        };
    }
    month_number(&value.to_lowercase()).ok_or_else(|| format!("unknown month: {value:?}"))
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "seedbank=info",
        1 => "seedbank=debug",
        _ => "seedbank=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Get { day, month, year } => cmd_get(db, day, month, year).await,
        Command::Next {
            day,
            month,
            year,
            count,
        } => cmd_next(db, day, month, year, count).await,
        Command::Show { id } => cmd_show(db, id).await,
        Command::List { offset, limit } => cmd_list(db, offset, limit).await,
        Command::Update { id, file } => cmd_update(db, id, file.as_deref()).await,
        Command::Scrape => cmd_scrape(db).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Service setup
// ---------------------------------------------------------------------------

/// Loaded config plus the resolved database path.
struct Context {
    config: ScrapeConfig,
    db_path: PathBuf,
}

impl Context {
    fn load(db: Option<PathBuf>) -> Result<Self> {
        let app: AppConfig = load_config()?;
        let db_path = match db {
            Some(path) => path,
            None => expand_home(&app.defaults.database_path)?,
        };
        Ok(Self {
            config: ScrapeConfig::from(&app),
            db_path,
        })
    }

    /// A service that may scrape and write.
    async fn writable(&self, progress: &ProgressBar) -> Result<SeedService> {
        let service = self
            .editable()
            .await?
            .with_progress(Box::new(CliProgress::new(progress.clone())));
        Ok(service)
    }

    /// A writable service that reports no progress.
    async fn editable(&self) -> Result<SeedService> {
        let storage = Storage::open(&self.db_path).await?;
        Ok(SeedService::new(storage, &self.config)?)
    }

    /// A service over an existing database, for read-only commands.
    async fn readonly(&self) -> Result<SeedService> {
        if !self.db_path.exists() {
            return Err(eyre!("no database at {}", self.db_path.display()));
        }
        let storage = Storage::open_readonly(&self.db_path).await?;
        Ok(SeedService::new(storage, &self.config)?)
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_get(db: Option<PathBuf>, day: u32, month: u32, year: i32) -> Result<()> {
    let ctx = Context::load(db)?;
    let spinner = new_spinner();
    let service = ctx.writable(&spinner).await?;

    info!(day, month, year, "getting seed");
    let result = service.get_by_day(day, month, year).await;
    spinner.finish_and_clear();

    print_json(&result?)
}

async fn cmd_next(
    db: Option<PathBuf>,
    day: u32,
    month: u32,
    year: i32,
    count: Option<u32>,
) -> Result<()> {
    let ctx = Context::load(db)?;
    let count = count.unwrap_or(ctx.config.lookahead_days);
    let spinner = new_spinner();
    let service = ctx.writable(&spinner).await?;

    info!(day, month, year, count, "getting seeds");
    let lookahead = service.get_next(day, month, year, count).await;
    spinner.finish_and_clear();

    match lookahead.error {
        Some(e) if lookahead.seeds.is_empty() => Err(e.into()),
        Some(e) => {
            warn!(obtained = lookahead.seeds.len(), requested = count, error = %e, "lookahead incomplete");
            eprintln!("  stopped after {} of {count} days: {e}", lookahead.seeds.len());
            print_json(&lookahead.seeds)
        }
        None => print_json(&lookahead.seeds),
    }
}

async fn cmd_show(db: Option<PathBuf>, id: i64) -> Result<()> {
    let service = Context::load(db)?.readonly().await?;
    print_json(&service.get(id).await?)
}

async fn cmd_list(db: Option<PathBuf>, offset: u64, limit: u64) -> Result<()> {
    let service = Context::load(db)?.readonly().await?;
    let total = service.count().await?;
    let seeds = service.query(offset, limit).await?;

    print_json(&serde_json::json!({
        "total": total,
        "offset": offset,
        "seeds": seeds,
    }))
}

async fn cmd_update(db: Option<PathBuf>, id: i64, file: Option<&Path>) -> Result<()> {
    let json = match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .map_err(|e| eyre!("cannot read {}: {e}", path.display()))?,
        _ => std::io::read_to_string(std::io::stdin())?,
    };
    let record = parse_record(&json)?;

    let service = Context::load(db)?.editable().await?;
    info!(id, title = %record.title, "updating seed");
    service.update(id, &record).await?;

    print_json(&service.get(id).await?)
}

/// Parse a seed record from JSON. Any `id` in the document is ignored.
fn parse_record(json: &str) -> Result<SeedRecord> {
    let mut record: SeedRecord =
        serde_json::from_str(json).map_err(|e| eyre!("invalid seed JSON: {e}"))?;
    record.id = None;
    Ok(record)
}

async fn cmd_scrape(db: Option<PathBuf>) -> Result<()> {
    let ctx = Context::load(db)?;
    let spinner = new_spinner();
    let service = ctx.writable(&spinner).await?;

    let result = service.scrape().await;
    spinner.finish_and_clear();
    let report = result?;

    println!();
    println!("  Scrape pass finished.");
    println!("  Job:     {}", report.job_id);
    println!("  Links:   {}", report.links_found);
    println!("  Stored:  {}", report.stored);
    println!("  Failed:  {}", report.failed);
    if let Some(error) = &report.last_error {
        println!("  Last error: {error}");
    }
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner that stays hidden until a scrape pass starts.
fn new_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    spinner
}

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new(spinner: ProgressBar) -> Self {
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner
            .enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner.set_message(name.to_string());
    }

    fn link_processed(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Extracting [{current}/{total}] {title}"));
    }

    fn done(&self, report: &ScrapeReport) {
        self.spinner
            .set_message(format!("Stored {} of {} seeds", report.stored, report.links_found));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_accepts_numbers_and_names() {
        assert_eq!(parse_month("8"), Ok(8));
        assert_eq!(parse_month("August"), Ok(8));
        assert_eq!(parse_month("march"), Ok(3));
        assert!(parse_month("13").is_err());
        assert!(parse_month("smarch").is_err());
    }

    #[test]
    fn update_reads_record_json() {
        let record = parse_record(
            r#"{
                "id": 99,
                "title": "Walk in Love",
                "date": "Tuesday 1st August 2017",
                "day": 1, "month": 8, "year": 2017,
                "paragraphs": [{"position": 0, "type": "plain_text", "content": "SEEDS OF DESTINY"}]
            }"#,
        )
        .expect("valid record");

        assert_eq!(record.id, None);
        assert_eq!(record.key(), (1, 8, 2017));
        assert_eq!(record.paragraphs.len(), 1);
        assert!(parse_record("{not json").is_err());
    }

    #[test]
    fn cli_parses_update() {
        let cli = Cli::try_parse_from(["seedbank", "update", "7", "--file", "seed.json"])
            .expect("parse");
        match cli.command {
            Command::Update { id, file } => {
                assert_eq!(id, 7);
                assert_eq!(file.as_deref(), Some(Path::new("seed.json")));
            }
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn cli_parses_lookahead() {
        let cli = Cli::try_parse_from(["seedbank", "next", "1", "january", "2020", "-c", "5"])
            .expect("parse");
        match cli.command {
            Command::Next {
                day,
                month,
                year,
                count,
            } => assert_eq!((day, month, year, count), (1, 1, 2020, Some(5))),
            _ => panic!("expected next"),
        }
    }
}
