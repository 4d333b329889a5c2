//! Flat-file JSON storage implementation
//!
//! The whole corpus lives in one JSON array. Every durable write replaces the
//! file through a temp file in the same directory followed by a rename, so a
//! crash never leaves a half-written corpus behind.

use crate::storage::traits::{Store, StorageError, StorageResult};
use crate::storage::JobRecord;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON file storage backend
pub struct JsonFileStore {
    path: PathBuf,
    records: Vec<JobRecord>,
    /// URL -> position in `records`
    index: HashMap<String, usize>,
    /// State at `begin_batch`, restored on rollback or failed commit
    snapshot: Option<Vec<JobRecord>>,
}

impl JsonFileStore {
    /// Opens the corpus at `path`, starting empty if the file does not exist
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the JSON array file
    ///
    /// # Returns
    ///
    /// * `Ok(JsonFileStore)` - Corpus loaded
    /// * `Err(StorageError)` - File unreadable or not a JSON array of records
    pub fn new(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();

        let records: Vec<JobRecord> = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            Vec::new()
        };

        let mut store = Self {
            path,
            records: Vec::new(),
            index: HashMap::new(),
            snapshot: None,
        };
        store.replace_records(records);

        tracing::debug!(
            "Loaded {} records from {}",
            store.records.len(),
            store.path.display()
        );

        Ok(store)
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Swaps in a new record list and rebuilds the index
    ///
    /// A file edited by hand may repeat a URL; the first occurrence wins and
    /// absorbs the tags of the later ones.
    fn replace_records(&mut self, records: Vec<JobRecord>) {
        self.records.clear();
        self.index.clear();

        for record in records {
            match self.index.get(&record.url) {
                Some(&pos) => {
                    tracing::warn!("Duplicate record in corpus file: {}", record.url);
                    for search in &record.searches {
                        self.records[pos].add_search(search);
                    }
                }
                None => {
                    self.index.insert(record.url.clone(), self.records.len());
                    self.records.push(record);
                }
            }
        }
    }

    fn in_batch(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Writes the corpus to a temp file and renames it over the target
    fn persist(&self) -> StorageResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "corpus.json".to_string());
        let temp_path = dir.join(format!(".{}.tmp", file_name));

        let json = serde_json::to_vec_pretty(&self.records)?;

        let written = (|| -> std::io::Result<()> {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.flush()?;
            file.sync_all()?;
            fs::rename(&temp_path, &self.path)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(StorageError::Io(e));
        }

        tracing::debug!(
            "Persisted {} records to {}",
            self.records.len(),
            self.path.display()
        );
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn list_known(&self) -> StorageResult<HashSet<String>> {
        Ok(self.index.keys().cloned().collect())
    }

    fn exists(&self, identifier: &str) -> StorageResult<bool> {
        Ok(self.index.contains_key(identifier))
    }

    fn get(&self, identifier: &str) -> StorageResult<Option<JobRecord>> {
        Ok(self
            .index
            .get(identifier)
            .map(|&pos| self.records[pos].clone()))
    }

    fn count(&self) -> StorageResult<u64> {
        Ok(self.records.len() as u64)
    }

    fn append_tag(&mut self, identifier: &str, query: &str) -> StorageResult<usize> {
        let pos = match self.index.get(identifier) {
            Some(&pos) => pos,
            None => return Ok(0),
        };

        if !self.records[pos].add_search(query) {
            return Ok(0);
        }

        if !self.in_batch() {
            if let Err(e) = self.persist() {
                self.records[pos].searches.pop();
                return Err(e);
            }
        }
        Ok(1)
    }

    fn insert(&mut self, record: &JobRecord) -> StorageResult<()> {
        if self.index.contains_key(&record.url) {
            return Err(StorageError::DuplicateKey(record.url.clone()));
        }

        self.index.insert(record.url.clone(), self.records.len());
        self.records.push(record.clone());

        if !self.in_batch() {
            if let Err(e) = self.persist() {
                self.records.pop();
                self.index.remove(&record.url);
                return Err(e);
            }
        }
        Ok(())
    }

    fn begin_batch(&mut self) -> StorageResult<()> {
        if self.in_batch() {
            return Err(StorageError::BatchInProgress);
        }
        self.snapshot = Some(self.records.clone());
        Ok(())
    }

    fn commit_batch(&mut self) -> StorageResult<()> {
        let snapshot = self.snapshot.take().ok_or(StorageError::NoActiveBatch)?;

        if let Err(e) = self.persist() {
            self.replace_records(snapshot);
            return Err(e);
        }
        Ok(())
    }

    fn rollback_batch(&mut self) -> StorageResult<()> {
        let snapshot = self.snapshot.take().ok_or(StorageError::NoActiveBatch)?;
        self.replace_records(snapshot);
        Ok(())
    }

    fn multi_search_count(&self) -> StorageResult<u64> {
        Ok(self.records.iter().filter(|r| r.searches.len() > 1).count() as u64)
    }

    fn search_counts(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for record in &self.records {
            for search in &record.searches {
                *counts.entry(search.as_str()).or_insert(0) += 1;
            }
        }

        let mut counts: Vec<(String, u64)> = counts
            .into_iter()
            .map(|(query, n)| (query.to_string(), n))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Field;
    use tempfile::TempDir;

    fn record(url: &str, searches: &[&str]) -> JobRecord {
        let mut record = JobRecord::new(url);
        record.title = Field::from("Data Engineer");
        for s in searches {
            record.add_search(s);
        }
        record
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("corpus.json")).unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.list_known().unwrap().is_empty());
    }

    #[test]
    fn test_insert_persists_immediately() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.json");

        let mut store = JsonFileStore::new(&path).unwrap();
        store.insert(&record("https://x/1", &["q=a"])).unwrap();

        let reopened = JsonFileStore::new(&path).unwrap();
        let loaded = reopened.get("https://x/1").unwrap().unwrap();
        assert_eq!(loaded.title.as_str(), "Data Engineer");
        assert_eq!(loaded.searches, vec!["q=a"]);
    }

    #[test]
    fn test_file_is_pretty_json_array_with_sentinel() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.json");

        let mut store = JsonFileStore::new(&path).unwrap();
        store.insert(&record("https://x/1", &["q=a"])).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["salary"], "N/A");
        assert!(contents.contains('\n'));
        assert!(!dir.path().join(".corpus.json.tmp").exists());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("corpus.json")).unwrap();
        store.insert(&record("https://x/1", &["q=a"])).unwrap();

        let err = store.insert(&record("https://x/1", &["q=b"])).unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_append_tag_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("corpus.json")).unwrap();
        store.insert(&record("https://x/1", &["q=a"])).unwrap();

        assert_eq!(store.append_tag("https://x/1", "q=b").unwrap(), 1);
        assert_eq!(store.append_tag("https://x/1", "q=b").unwrap(), 0);
        assert_eq!(store.append_tag("https://x/missing", "q=b").unwrap(), 0);
        assert_eq!(
            store.get("https://x/1").unwrap().unwrap().searches,
            vec!["q=a", "q=b"]
        );
    }

    #[test]
    fn test_batch_written_only_on_commit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.json");
        let mut store = JsonFileStore::new(&path).unwrap();

        store.begin_batch().unwrap();
        store.insert(&record("https://x/1", &["q=a"])).unwrap();
        store.insert(&record("https://x/2", &["q=a"])).unwrap();
        assert!(!path.exists());

        store.commit_batch().unwrap();
        let reopened = JsonFileStore::new(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 2);
    }

    #[test]
    fn test_rollback_restores_state() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("corpus.json")).unwrap();
        store.insert(&record("https://x/1", &["q=a"])).unwrap();

        store.begin_batch().unwrap();
        store.insert(&record("https://x/2", &["q=a"])).unwrap();
        store.append_tag("https://x/1", "q=b").unwrap();
        store.rollback_batch().unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert!(!store.exists("https://x/2").unwrap());
        assert_eq!(
            store.get("https://x/1").unwrap().unwrap().searches,
            vec!["q=a"]
        );
    }

    #[test]
    fn test_failed_commit_restores_state() {
        let dir = TempDir::new().unwrap();
        // Parent directory does not exist, so the temp file cannot be created
        let mut store = JsonFileStore::new(dir.path().join("missing").join("corpus.json")).unwrap();

        store.begin_batch().unwrap();
        store.insert(&record("https://x/1", &["q=a"])).unwrap();
        assert!(store.commit_batch().is_err());

        assert_eq!(store.count().unwrap(), 0);
        assert!(matches!(
            store.rollback_batch(),
            Err(StorageError::NoActiveBatch)
        ));
    }

    #[test]
    fn test_failed_unbatched_insert_is_undone() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("missing").join("corpus.json")).unwrap();

        assert!(store.insert(&record("https://x/1", &["q=a"])).is_err());
        assert!(!store.exists("https://x/1").unwrap());
    }

    #[test]
    fn test_duplicate_urls_in_file_are_merged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.json");
        let records = vec![
            record("https://x/1", &["q=a"]),
            record("https://x/1", &["q=b"]),
        ];
        fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();

        let store = JsonFileStore::new(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(
            store.get("https://x/1").unwrap().unwrap().searches,
            vec!["q=a", "q=b"]
        );
    }

    #[test]
    fn test_search_counts() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("corpus.json")).unwrap();
        store.insert(&record("https://x/1", &["q=b", "q=a"])).unwrap();
        store.insert(&record("https://x/2", &["q=a"])).unwrap();

        assert_eq!(
            store.search_counts().unwrap(),
            vec![("q=a".to_string(), 2), ("q=b".to_string(), 1)]
        );
        assert_eq!(store.multi_search_count().unwrap(), 1);
    }

    #[test]
    fn test_opens_scraper_written_corpus() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dice_job_data.json");
        let contents = r#"[
    {
        "url": "https://www.dice.com/job-detail/abc",
        "current_datetime": "2025-09-29T12:00:00.123456",
        "title": "Software Engineer",
        "company": "Acme",
        "location": "Remote",
        "posted_date": "2025-09-28T00:00:00Z",
        "updated_date": "1 day ago",
        "job_types": ["Remote"],
        "salary": "N/A",
        "skills": ["Rust", "SQL"],
        "description": "Write software.",
        "searches": ["q=rust"]
    },
    {
        "url": "https://www.dice.com/job-detail/def",
        "current_datetime": "2025-09-29T12:05:00.000001",
        "title": "Data Engineer",
        "company": "N/A",
        "location": "Austin, TX",
        "posted_date": "N/A",
        "updated_date": "N/A",
        "job_types": [],
        "salary": "N/A",
        "skills": [],
        "description": "N/A"
    }
]"#;
        fs::write(&path, contents).unwrap();

        let mut store = JsonFileStore::new(&path).unwrap();
        assert_eq!(store.count().unwrap(), 2);

        let def = "https://www.dice.com/job-detail/def";
        assert!(store.get(def).unwrap().unwrap().searches.is_empty());
        assert_eq!(store.append_tag(def, "q=data").unwrap(), 1);

        let reopened = JsonFileStore::new(&path).unwrap();
        let loaded = reopened.get(def).unwrap().unwrap();
        assert_eq!(loaded.searches, vec!["q=data"]);
        assert_eq!(loaded.company, Field::NotAvailable);
        assert_eq!(
            loaded.scraped_at.to_rfc3339(),
            "2025-09-29T12:05:00.000001+00:00"
        );
    }
}
