//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Store trait.

use crate::storage::record::parse_timestamp;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Store, StorageError, StorageResult};
use crate::storage::{Field, JobRecord, RunRecord, RunStatus};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

const JOB_COLUMNS: &str = "url, scraped_at, title, company, location, posted_date, updated_date,
     job_types, salary, skills, description";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
    in_batch: bool,
}

/// A jobs row before its list columns and timestamp are decoded
struct JobRow {
    url: String,
    scraped_at: String,
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    posted_date: Option<String>,
    updated_date: Option<String>,
    job_types: String,
    salary: Option<String>,
    skills: String,
    description: Option<String>,
}

impl JobRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            scraped_at: row.get(1)?,
            title: row.get(2)?,
            company: row.get(3)?,
            location: row.get(4)?,
            posted_date: row.get(5)?,
            updated_date: row.get(6)?,
            job_types: row.get(7)?,
            salary: row.get(8)?,
            skills: row.get(9)?,
            description: row.get(10)?,
        })
    }

    fn into_record(self, searches: Vec<String>) -> StorageResult<JobRecord> {
        let scraped_at = parse_timestamp(&self.scraped_at).ok_or_else(|| {
            StorageError::Database(format!(
                "Invalid scraped_at '{}' for {}",
                self.scraped_at, self.url
            ))
        })?;

        Ok(JobRecord {
            url: self.url,
            scraped_at,
            title: Field::from_text(self.title),
            company: Field::from_text(self.company),
            location: Field::from_text(self.location),
            posted_date: Field::from_text(self.posted_date),
            updated_date: Field::from_text(self.updated_date),
            job_types: serde_json::from_str(&self.job_types)?,
            salary: Field::from_text(self.salary),
            skills: serde_json::from_str(&self.skills)?,
            description: Field::from_text(self.description),
            searches,
        })
    }
}

impl SqliteStore {
    /// Opens or creates a database at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            in_batch: false,
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            in_batch: false,
        })
    }

    fn load_searches(&self, url: &str) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT query FROM job_searches WHERE job_url = ?1 ORDER BY id")?;
        let searches = stmt
            .query_map(params![url], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(searches)
    }
}

/// True if the error is a primary-key or unique-index collision
fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl Store for SqliteStore {
    // ===== Membership =====

    fn list_known(&self) -> StorageResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM jobs")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;
        Ok(urls)
    }

    fn exists(&self, identifier: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM jobs WHERE url = ?1",
                params![identifier],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn get(&self, identifier: &str) -> StorageResult<Option<JobRecord>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE url = ?1", JOB_COLUMNS),
                params![identifier],
                JobRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => {
                let searches = self.load_searches(identifier)?;
                Ok(Some(row.into_record(searches)?))
            }
            None => Ok(None),
        }
    }

    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Mutation =====

    fn append_tag(&mut self, identifier: &str, query: &str) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO job_searches (job_url, query, added_at)
             SELECT url, ?2, ?3 FROM jobs WHERE url = ?1",
            params![identifier, query, now],
        )?;
        Ok(changed)
    }

    fn insert(&mut self, record: &JobRecord) -> StorageResult<()> {
        let job_types = serde_json::to_string(&record.job_types)?;
        let skills = serde_json::to_string(&record.skills)?;

        // Savepoint so a record never lands without its searches
        let sp = self.conn.savepoint()?;

        let inserted = sp.execute(
            &format!(
                "INSERT INTO jobs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                JOB_COLUMNS
            ),
            params![
                record.url,
                record.scraped_at.to_rfc3339(),
                record.title.value(),
                record.company.value(),
                record.location.value(),
                record.posted_date.value(),
                record.updated_date.value(),
                job_types,
                record.salary.value(),
                skills,
                record.description.value(),
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StorageError::DuplicateKey(record.url.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        let now = Utc::now().to_rfc3339();
        for query in &record.searches {
            sp.execute(
                "INSERT OR IGNORE INTO job_searches (job_url, query, added_at) VALUES (?1, ?2, ?3)",
                params![record.url, query, now],
            )?;
        }

        sp.commit()?;
        Ok(())
    }

    // ===== Batches =====

    fn begin_batch(&mut self) -> StorageResult<()> {
        if self.in_batch {
            return Err(StorageError::BatchInProgress);
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.in_batch = true;
        Ok(())
    }

    fn commit_batch(&mut self) -> StorageResult<()> {
        if !self.in_batch {
            return Err(StorageError::NoActiveBatch);
        }
        self.in_batch = false;

        if let Err(e) = self.conn.execute_batch("COMMIT") {
            // A failed COMMIT can leave the transaction open
            if !self.conn.is_autocommit() {
                let _ = self.conn.execute_batch("ROLLBACK");
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn rollback_batch(&mut self) -> StorageResult<()> {
        if !self.in_batch {
            return Err(StorageError::NoActiveBatch);
        }
        self.in_batch = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    // ===== Statistics =====

    fn search_counts(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT query, COUNT(*) FROM job_searches GROUP BY query ORDER BY COUNT(*) DESC, query",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    fn multi_search_count(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (
                SELECT job_url FROM job_searches GROUP BY job_url HAVING COUNT(*) > 1
             )",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn record_run(&mut self, run: &RunRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO runs (query, config_hash, started_at, finished_at, status, total_pages,
             links_collected, new_records, tagged_records, skipped_items, failed_pages)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                run.query,
                run.config_hash,
                run.started_at,
                run.finished_at,
                run.status.to_db_string(),
                run.total_pages,
                run.links_collected as i64,
                run.new_records as i64,
                run.tagged_records as i64,
                run.skipped_items as i64,
                run.failed_pages as i64,
            ],
        )?;
        Ok(())
    }

    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, query, config_hash, started_at, finished_at, status, total_pages,
             links_collected, new_records, tagged_records, skipped_items, failed_pages
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;

        let runs = stmt
            .query_map(params![limit as i64], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    query: row.get(1)?,
                    config_hash: row.get(2)?,
                    started_at: row.get(3)?,
                    finished_at: row.get(4)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
                        .unwrap_or(RunStatus::Failed),
                    total_pages: row.get(6)?,
                    links_collected: row.get::<_, i64>(7)? as u64,
                    new_records: row.get::<_, i64>(8)? as u64,
                    tagged_records: row.get::<_, i64>(9)? as u64,
                    skipped_items: row.get::<_, i64>(10)? as u64,
                    failed_pages: row.get::<_, i64>(11)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }
}
