// Append-only JSONL journal

use crate::record::Record;
use eyre::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Marker line written in place of a deleted record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tombstone {
    pub id: String,
    pub deleted: bool,
    pub updated_at: i64,
}

impl Tombstone {
    pub fn new(id: &str, updated_at: i64) -> Self {
        Self {
            id: id.to_string(),
            deleted: true,
            updated_at,
        }
    }
}

/// One line of the journal
#[derive(Debug, Clone)]
pub enum Entry<T> {
    Put(T),
    Delete(Tombstone),
}

impl<T: Record> Entry<T> {
    pub fn id(&self) -> &str {
        match self {
            Entry::Put(record) => record.id(),
            Entry::Delete(tombstone) => &tombstone.id,
        }
    }

    pub fn updated_at(&self) -> i64 {
        match self {
            Entry::Put(record) => record.updated_at(),
            Entry::Delete(tombstone) => tombstone.updated_at,
        }
    }

    /// Parse one journal line as a tombstone or a record of `T`
    pub fn parse(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line).context("Failed to parse JSON")?;

        if value.get("deleted").and_then(|v| v.as_bool()).unwrap_or(false) {
            let tombstone = serde_json::from_value(value).context("Malformed tombstone")?;
            return Ok(Entry::Delete(tombstone));
        }

        let record = serde_json::from_value(value)
            .with_context(|| format!("Line is not a {} record", T::collection_name()))?;
        Ok(Entry::Put(record))
    }

    fn to_line(&self) -> Result<String> {
        let line = match self {
            Entry::Put(record) => serde_json::to_string(record)?,
            Entry::Delete(tombstone) => serde_json::to_string(tombstone)?,
        };
        Ok(line)
    }
}

/// Journal file for a single collection
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Journal for the collection of `T` inside `dir`
    pub fn for_collection<T: Record>(dir: &Path) -> Self {
        Self::new(dir.join(format!("{}.jsonl", T::collection_name())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append entries under an exclusive lock, then fsync
    pub fn append<T: Record>(&self, entries: &[Entry<T>]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context("Failed to open journal for appending")?;

        file.lock_exclusive().context("Failed to acquire journal lock")?;

        let mut buf = String::new();
        for entry in entries {
            buf.push_str(&entry.to_line()?);
            buf.push('\n');
        }
        file.write_all(buf.as_bytes()).context("Failed to write journal")?;
        file.sync_all()?;

        debug!(file = ?self.path, count = entries.len(), "Appended journal entries");

        // Lock is released when file is dropped
        Ok(())
    }

    /// Replay the journal, returning the live records keyed by ID
    ///
    /// For duplicate IDs the entry with the highest updated_at wins; on a tie
    /// the later line wins. Tombstones remove the record. Unreadable or
    /// malformed lines are skipped with a warning.
    pub fn replay<T: Record>(&self) -> Result<HashMap<String, T>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let file = File::open(&self.path).context("Failed to open journal")?;
        let reader = BufReader::new(file);
        let mut latest: HashMap<String, Entry<T>> = HashMap::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!(file = ?self.path, line = line_num + 1, error = ?e, "Failed to read line, skipping");
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let entry = match Entry::<T>::parse(&line) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(file = ?self.path, line = line_num + 1, error = ?e, "Malformed journal line, skipping");
                    continue;
                }
            };

            // Later lines win ties
            let superseded = latest
                .get(entry.id())
                .is_some_and(|existing| existing.updated_at() > entry.updated_at());
            if !superseded {
                latest.insert(entry.id().to_string(), entry);
            }
        }

        let records: HashMap<String, T> = latest
            .into_iter()
            .filter_map(|(id, entry)| match entry {
                Entry::Put(record) => Some((id, record)),
                Entry::Delete(_) => None,
            })
            .collect();

        info!(file = ?self.path, count = records.len(), "Replayed journal");

        Ok(records)
    }

    /// Modification time of the journal in seconds, if it exists
    pub fn mtime(&self) -> Result<Option<i64>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let modified = std::fs::metadata(&self.path)?.modified()?;
        let secs = modified
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Ok(Some(secs))
    }
}
