//! libSQL storage layer for seed records.
//!
//! The [`Storage`] struct wraps a local libSQL database holding seeds, their
//! ordered paragraph blocks, and the history of scrape passes.
//!
//! **Write rules:**
//! - A seed row and all of its paragraph rows are written in one transaction;
//!   a failure anywhere rolls back the whole record.
//! - Seeds are unique per `(day, month, year)`. [`Storage::create_seed`]
//!   updates the existing row for that day instead of inserting a duplicate.

mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, Transaction, params};
use seedbank_shared::{ParagraphBlock, ParagraphKind, Result, SeedError, SeedRecord};
use tracing::{debug, warn};
use uuid::Uuid;

/// Column list shared by every seed `SELECT`, in [`row_to_seed`] order.
const SEED_COLUMNS: &str = "id, title, thought, content, prayer, assignment, daily_reading, \
     quote, resource, scripture, remember_this, date, year, month, day";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SeedError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(SeedError::storage)?;

        let conn = db.connect().map_err(SeedError::storage)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(SeedError::storage)?;

        let conn = db.connect().map_err(SeedError::storage)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    SeedError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(SeedError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Seed reads
    // -----------------------------------------------------------------------

    /// Get a seed, with its paragraphs, by row ID.
    pub async fn get_seed(&self, id: i64) -> Result<Option<SeedRecord>> {
        let sql = format!("SELECT {SEED_COLUMNS} FROM seeds WHERE id = ?1");
        let mut rows = self
            .conn
            .query(&sql, params![id])
            .await
            .map_err(SeedError::storage)?;

        match rows.next().await.map_err(SeedError::storage)? {
            Some(row) => {
                let mut seed = row_to_seed(&row)?;
                seed.paragraphs = load_paragraphs(&self.conn, id).await?;
                Ok(Some(seed))
            }
            None => Ok(None),
        }
    }

    /// Get the seed for a calendar day, with its paragraphs.
    pub async fn get_seed_by_day(
        &self,
        day: u32,
        month: u32,
        year: i32,
    ) -> Result<Option<SeedRecord>> {
        let sql = format!(
            "SELECT {SEED_COLUMNS} FROM seeds WHERE day = ?1 AND month = ?2 AND year = ?3"
        );
        let mut rows = self
            .conn
            .query(&sql, params![i64::from(day), i64::from(month), i64::from(year)])
            .await
            .map_err(SeedError::storage)?;

        match rows.next().await.map_err(SeedError::storage)? {
            Some(row) => {
                let mut seed = row_to_seed(&row)?;
                let id = seed.id.unwrap_or_default();
                seed.paragraphs = load_paragraphs(&self.conn, id).await?;
                Ok(Some(seed))
            }
            None => Ok(None),
        }
    }

    /// Count all stored seeds.
    pub async fn count_seeds(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM seeds", params![])
            .await
            .map_err(SeedError::storage)?;

        match rows.next().await.map_err(SeedError::storage)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(SeedError::storage)? as u64),
            None => Ok(0),
        }
    }

    /// List seeds ordered by ID, with their paragraphs.
    pub async fn query_seeds(&self, offset: u64, limit: u64) -> Result<Vec<SeedRecord>> {
        let sql = format!("SELECT {SEED_COLUMNS} FROM seeds ORDER BY id LIMIT ?1 OFFSET ?2");
        let mut rows = self
            .conn
            .query(&sql, params![limit as i64, offset as i64])
            .await
            .map_err(SeedError::storage)?;

        let mut seeds = Vec::new();
        while let Some(row) = rows.next().await.map_err(SeedError::storage)? {
            seeds.push(row_to_seed(&row)?);
        }
        drop(rows);

        for seed in &mut seeds {
            let id = seed.id.unwrap_or_default();
            seed.paragraphs = load_paragraphs(&self.conn, id).await?;
        }
        Ok(seeds)
    }

    // -----------------------------------------------------------------------
    // Seed writes
    // -----------------------------------------------------------------------

    /// Save a seed, updating the existing row for the same day if there is one.
    ///
    /// Returns the row ID, which is the existing row's ID on update.
    pub async fn create_seed(&self, seed: &SeedRecord) -> Result<i64> {
        self.check_writable()?;
        let tx = self.conn.transaction().await.map_err(SeedError::storage)?;

        let outcome: Result<i64> = async {
            let id = match find_id_by_day(&tx, seed.day, seed.month, seed.year).await? {
                Some(existing) => {
                    debug!(id = existing, "seed already stored for day, updating");
                    update_seed_row(&tx, existing, seed).await?;
                    existing
                }
                None => insert_seed_row(&tx, seed).await?,
            };
            replace_paragraphs(&tx, id, &seed.paragraphs).await?;
            Ok(id)
        }
        .await;

        finish(tx, outcome).await
    }

    /// Overwrite the seed with ID `id`, replacing its paragraph list.
    pub async fn update_seed(&self, id: i64, seed: &SeedRecord) -> Result<()> {
        self.check_writable()?;
        let tx = self.conn.transaction().await.map_err(SeedError::storage)?;

        let outcome: Result<()> = async {
            if !seed_exists(&tx, id).await? {
                return Err(SeedError::RecordNotFound { id });
            }
            update_seed_row(&tx, id, seed).await?;
            replace_paragraphs(&tx, id, &seed.paragraphs).await
        }
        .await;

        finish(tx, outcome).await
    }

    // -----------------------------------------------------------------------
    // Scrape job operations
    // -----------------------------------------------------------------------

    /// Record the start of a scrape pass. Returns the generated job ID.
    pub async fn insert_scrape_job(&self) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO scrape_jobs (id, started_at) VALUES (?1, ?2)",
                params![id.as_str(), now.as_str()],
            )
            .await
            .map_err(SeedError::storage)?;
        Ok(id)
    }

    /// Mark a scrape pass finished with its stats.
    pub async fn finish_scrape_job(&self, job_id: &str, stats_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE scrape_jobs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, job_id],
            )
            .await
            .map_err(SeedError::storage)?;
        Ok(())
    }

    /// Get a scrape job by ID.
    pub async fn get_scrape_job(&self, job_id: &str) -> Result<Option<ScrapeJob>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, started_at, finished_at, stats_json FROM scrape_jobs WHERE id = ?1",
                params![job_id],
            )
            .await
            .map_err(SeedError::storage)?;

        match rows.next().await.map_err(SeedError::storage)? {
            Some(row) => Ok(Some(ScrapeJob {
                id: row.get::<String>(0).map_err(SeedError::storage)?,
                started_at: row.get::<String>(1).map_err(SeedError::storage)?,
                finished_at: row.get::<String>(2).ok(),
                stats_json: row.get::<String>(3).ok(),
            })),
            None => Ok(None),
        }
    }
}

/// A recorded scrape pass.
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    pub id: String,
    /// RFC 3339 start timestamp.
    pub started_at: String,
    /// RFC 3339 finish timestamp; `None` while running or if it never finished.
    pub finished_at: Option<String>,
    pub stats_json: Option<String>,
}

// ---------------------------------------------------------------------------
// Transaction helpers
// ---------------------------------------------------------------------------

/// Commit on success, roll back on failure.
async fn finish<T>(tx: Transaction, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(SeedError::storage)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}

async fn find_id_by_day(
    conn: &Connection,
    day: u32,
    month: u32,
    year: i32,
) -> Result<Option<i64>> {
    let mut rows = conn
        .query(
            "SELECT id FROM seeds WHERE day = ?1 AND month = ?2 AND year = ?3",
            params![i64::from(day), i64::from(month), i64::from(year)],
        )
        .await
        .map_err(SeedError::storage)?;

    match rows.next().await.map_err(SeedError::storage)? {
        Some(row) => Ok(Some(row.get::<i64>(0).map_err(SeedError::storage)?)),
        None => Ok(None),
    }
}

async fn seed_exists(conn: &Connection, id: i64) -> Result<bool> {
    let mut rows = conn
        .query("SELECT 1 FROM seeds WHERE id = ?1", params![id])
        .await
        .map_err(SeedError::storage)?;
    Ok(rows.next().await.map_err(SeedError::storage)?.is_some())
}

async fn insert_seed_row(conn: &Connection, seed: &SeedRecord) -> Result<i64> {
    conn.execute(
        "INSERT INTO seeds (title, thought, content, prayer, assignment, daily_reading,
                            quote, resource, scripture, remember_this, date, year, month, day)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            seed.title.as_str(),
            seed.thought.as_str(),
            seed.content.as_str(),
            seed.prayer.as_str(),
            seed.assignment.as_str(),
            seed.daily_reading.as_str(),
            seed.quote.as_str(),
            seed.resource.as_str(),
            seed.scripture.as_str(),
            seed.remember_this.as_str(),
            seed.date.as_str(),
            i64::from(seed.year),
            i64::from(seed.month),
            i64::from(seed.day),
        ],
    )
    .await
    .map_err(SeedError::storage)?;

    Ok(conn.last_insert_rowid())
}

async fn update_seed_row(conn: &Connection, id: i64, seed: &SeedRecord) -> Result<()> {
    conn.execute(
        "UPDATE seeds SET
           title = ?1, thought = ?2, content = ?3, prayer = ?4, assignment = ?5,
           daily_reading = ?6, quote = ?7, resource = ?8, scripture = ?9,
           remember_this = ?10, date = ?11, year = ?12, month = ?13, day = ?14
         WHERE id = ?15",
        params![
            seed.title.as_str(),
            seed.thought.as_str(),
            seed.content.as_str(),
            seed.prayer.as_str(),
            seed.assignment.as_str(),
            seed.daily_reading.as_str(),
            seed.quote.as_str(),
            seed.resource.as_str(),
            seed.scripture.as_str(),
            seed.remember_this.as_str(),
            seed.date.as_str(),
            i64::from(seed.year),
            i64::from(seed.month),
            i64::from(seed.day),
            id,
        ],
    )
    .await
    .map_err(SeedError::storage)?;
    Ok(())
}

/// Delete a seed's paragraphs and insert `paragraphs` in their given order.
async fn replace_paragraphs(
    conn: &Connection,
    seed_id: i64,
    paragraphs: &[ParagraphBlock],
) -> Result<()> {
    conn.execute("DELETE FROM paragraphs WHERE seed_id = ?1", params![seed_id])
        .await
        .map_err(SeedError::storage)?;

    for paragraph in paragraphs {
        conn.execute(
            "INSERT INTO paragraphs (seed_id, position, kind, content) VALUES (?1, ?2, ?3, ?4)",
            params![
                seed_id,
                i64::from(paragraph.position),
                paragraph.kind.code(),
                paragraph.content.as_str(),
            ],
        )
        .await
        .map_err(SeedError::storage)?;
    }
    Ok(())
}

async fn load_paragraphs(conn: &Connection, seed_id: i64) -> Result<Vec<ParagraphBlock>> {
    let mut rows = conn
        .query(
            "SELECT position, kind, content FROM paragraphs WHERE seed_id = ?1 ORDER BY position, id",
            params![seed_id],
        )
        .await
        .map_err(SeedError::storage)?;

    let mut paragraphs = Vec::new();
    while let Some(row) = rows.next().await.map_err(SeedError::storage)? {
        paragraphs.push(ParagraphBlock {
            position: row.get::<i64>(0).map_err(SeedError::storage)? as u32,
            kind: ParagraphKind::from_code(row.get::<i64>(1).map_err(SeedError::storage)?)?,
            content: row.get::<String>(2).map_err(SeedError::storage)?,
        });
    }
    Ok(paragraphs)
}

/// Convert a database row selected with [`SEED_COLUMNS`] to a [`SeedRecord`].
/// Paragraphs are loaded separately.
fn row_to_seed(row: &libsql::Row) -> Result<SeedRecord> {
    let text = |idx: i32| row.get::<String>(idx).map_err(SeedError::storage);
    let int = |idx: i32| row.get::<i64>(idx).map_err(SeedError::storage);

    Ok(SeedRecord {
        id: Some(int(0)?),
        title: text(1)?,
        thought: text(2)?,
        content: text(3)?,
        prayer: text(4)?,
        assignment: text(5)?,
        daily_reading: text(6)?,
        quote: text(7)?,
        resource: text(8)?,
        scripture: text(9)?,
        remember_this: text(10)?,
        date: text(11)?,
        year: int(12)? as i32,
        month: int(13)? as u32,
        day: int(14)? as u32,
        paragraphs: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("seedbank_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn sample_seed(day: u32, title: &str) -> SeedRecord {
        SeedRecord {
            title: title.into(),
            thought: "Love is the currency of the kingdom.".into(),
            scripture: "Ephesians 5:2".into(),
            date: format!("Monday {day}th January 2020"),
            day,
            month: 1,
            year: 2020,
            paragraphs: vec![
                ParagraphBlock::plain(0, "SEEDS OF DESTINY"),
                ParagraphBlock::plain(1, format!("Monday {day}th January 2020")),
                ParagraphBlock::plain(2, "Ephesians 5:2"),
            ],
            ..SeedRecord::default()
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("seedbank_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn create_and_read_back() {
        let storage = test_storage().await;
        let seed = sample_seed(6, "Walk in Love");

        let id = storage.create_seed(&seed).await.expect("create seed");

        let by_id = storage.get_seed(id).await.expect("get seed").expect("present");
        assert_eq!(by_id.id, Some(id));
        assert_eq!(by_id.title, "Walk in Love");
        assert_eq!(by_id.key(), (6, 1, 2020));
        assert_eq!(by_id.paragraphs, seed.paragraphs);

        let by_day = storage
            .get_seed_by_day(6, 1, 2020)
            .await
            .expect("get by day")
            .expect("present");
        assert_eq!(by_day.id, Some(id));
        assert_eq!(by_day.paragraphs.len(), 3);

        assert!(storage.get_seed_by_day(7, 1, 2020).await.unwrap().is_none());
        assert!(storage.get_seed(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_same_day_updates_in_place() {
        let storage = test_storage().await;

        let first = storage.create_seed(&sample_seed(6, "Draft")).await.unwrap();

        let mut revised = sample_seed(6, "Walk in Love");
        revised.paragraphs = vec![ParagraphBlock::plain(0, "only block")];
        let second = storage.create_seed(&revised).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(storage.count_seeds().await.unwrap(), 1);

        let stored = storage.get_seed(first).await.unwrap().unwrap();
        assert_eq!(stored.title, "Walk in Love");
        assert_eq!(stored.paragraphs.len(), 1);
        assert_eq!(stored.paragraphs[0].content, "only block");
    }

    #[tokio::test]
    async fn update_replaces_blocks() {
        let storage = test_storage().await;
        let id = storage.create_seed(&sample_seed(6, "Walk in Love")).await.unwrap();

        let mut edited = storage.get_seed(id).await.unwrap().unwrap();
        edited.prayer = "Father, fill my heart.".into();
        edited.paragraphs.push(ParagraphBlock::plain(3, "PRAYER: Father, fill my heart."));
        storage.update_seed(id, &edited).await.expect("update");

        let stored = storage.get_seed(id).await.unwrap().unwrap();
        assert_eq!(stored.prayer, "Father, fill my heart.");
        assert_eq!(stored.paragraphs.len(), 4);
        assert_eq!(stored.paragraphs[3].position, 3);
    }

    #[tokio::test]
    async fn update_unknown_id_fails() {
        let storage = test_storage().await;
        let err = storage
            .update_seed(42, &sample_seed(6, "Ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, SeedError::RecordNotFound { id: 42 }));
    }

    #[tokio::test]
    async fn failed_update_rolls_back() {
        let storage = test_storage().await;
        let a = storage.create_seed(&sample_seed(6, "A")).await.unwrap();
        storage.create_seed(&sample_seed(7, "B")).await.unwrap();

        // Moving A onto B's day violates UNIQUE(day, month, year).
        let mut clash = sample_seed(7, "A moved");
        clash.paragraphs = vec![ParagraphBlock::plain(0, "should not persist")];
        assert!(storage.update_seed(a, &clash).await.is_err());

        let stored = storage.get_seed(a).await.unwrap().unwrap();
        assert_eq!(stored.title, "A");
        assert_eq!(stored.paragraphs.len(), 3);
    }

    #[tokio::test]
    async fn count_and_query_pages() {
        let storage = test_storage().await;
        for day in 1..=5 {
            storage
                .create_seed(&sample_seed(day, &format!("Seed {day}")))
                .await
                .unwrap();
        }

        assert_eq!(storage.count_seeds().await.unwrap(), 5);

        let page = storage.query_seeds(1, 2).await.expect("query");
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].title, "Seed 2");
        assert_eq!(page[1].title, "Seed 3");
        assert_eq!(page[0].paragraphs.len(), 3);

        assert!(storage.query_seeds(10, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scrape_job_lifecycle() {
        let storage = test_storage().await;

        let job_id = storage.insert_scrape_job().await.expect("insert job");
        assert!(!job_id.is_empty());

        let running = storage.get_scrape_job(&job_id).await.unwrap().unwrap();
        assert!(running.finished_at.is_none());

        storage
            .finish_scrape_job(&job_id, r#"{"stored": 2}"#)
            .await
            .expect("finish job");

        let done = storage.get_scrape_job(&job_id).await.unwrap().unwrap();
        assert!(done.finished_at.is_some());
        assert_eq!(done.stats_json.as_deref(), Some(r#"{"stored": 2}"#));
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("seedbank_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.create_seed(&sample_seed(6, "Walk in Love")).await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert!(ro.get_seed_by_day(6, 1, 2020).await.unwrap().is_some());

        let result = ro.create_seed(&sample_seed(7, "Another")).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }
}
