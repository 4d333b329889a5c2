//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Dice-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per job posting; the canonical URL is the natural key
CREATE TABLE IF NOT EXISTS jobs (
    url TEXT PRIMARY KEY NOT NULL,
    scraped_at TEXT NOT NULL,
    title TEXT,
    company TEXT,
    location TEXT,
    posted_date TEXT,
    updated_date TEXT,
    job_types TEXT NOT NULL DEFAULT '[]',
    salary TEXT,
    skills TEXT NOT NULL DEFAULT '[]',
    description TEXT
);

-- Query tokens attached to each posting, in the order they were added
CREATE TABLE IF NOT EXISTS job_searches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_url TEXT NOT NULL REFERENCES jobs(url),
    query TEXT NOT NULL,
    added_at TEXT NOT NULL,
    UNIQUE(job_url, query)
);

CREATE INDEX IF NOT EXISTS idx_job_searches_url ON job_searches(job_url);
CREATE INDEX IF NOT EXISTS idx_job_searches_query ON job_searches(query);

-- One row per finished ingest run
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    status TEXT NOT NULL,
    total_pages INTEGER NOT NULL DEFAULT 0,
    links_collected INTEGER NOT NULL DEFAULT 0,
    new_records INTEGER NOT NULL DEFAULT 0,
    tagged_records INTEGER NOT NULL DEFAULT 0,
    skipped_items INTEGER NOT NULL DEFAULT 0,
    failed_pages INTEGER NOT NULL DEFAULT 0
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
