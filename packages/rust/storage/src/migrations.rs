//! SQL migration definitions for the Seedbank database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: seeds, paragraphs, scrape_jobs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per daily seed, keyed by calendar day
CREATE TABLE IF NOT EXISTS seeds (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    title         TEXT NOT NULL,
    thought       TEXT NOT NULL DEFAULT '',
    content       TEXT NOT NULL DEFAULT '',
    prayer        TEXT NOT NULL DEFAULT '',
    assignment    TEXT NOT NULL DEFAULT '',
    daily_reading TEXT NOT NULL DEFAULT '',
    quote         TEXT NOT NULL DEFAULT '',
    resource      TEXT NOT NULL DEFAULT '',
    scripture     TEXT NOT NULL DEFAULT '',
    remember_this TEXT NOT NULL DEFAULT '',
    date          TEXT NOT NULL,
    year          INTEGER NOT NULL,
    month         INTEGER NOT NULL,
    day           INTEGER NOT NULL,
    UNIQUE(day, month, year)
);

-- Ordered text blocks of each seed
CREATE TABLE IF NOT EXISTS paragraphs (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    seed_id  INTEGER NOT NULL REFERENCES seeds(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    kind     INTEGER NOT NULL,
    content  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_paragraphs_seed_id ON paragraphs(seed_id, position);

-- Scrape pass history
CREATE TABLE IF NOT EXISTS scrape_jobs (
    id          TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
