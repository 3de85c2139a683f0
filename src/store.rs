// Task store using a JSONL journal with a SQLite cache

use crate::journal::{Entry, Journal, Tombstone};
use crate::models::{Task, UNASSIGNED_POSITION, now_ms};
use crate::record::Record;
use eyre::{Context, Result, eyre};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CURRENT_VERSION: u32 = 1;
const STORE_DIR: &str = ".tasklist";
const DB_FILE: &str = "tasklist.db";

/// Persistent task store with SQLite cache and JSONL source of truth
///
/// Mutations are staged in memory and written out by [`Store::flush`].
/// `insert`, `rename` and `delete` flush immediately after staging.
pub struct Store {
    base_path: PathBuf,
    db: Connection,
    journal: Journal,
    pending: Vec<Entry<Task>>,
}

impl Store {
    /// Open or create a store at the given path
    ///
    /// The store will be created in a `.tasklist` subdirectory of the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().join(STORE_DIR);

        fs::create_dir_all(&base_path)
            .with_context(|| format!("Failed to create store directory: {}", base_path.display()))?;

        let db_path = base_path.join(DB_FILE);
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let journal = Journal::for_collection::<Task>(&base_path);

        let mut store = Self {
            base_path,
            db,
            journal,
            pending: Vec::new(),
        };

        store.create_schema()?;
        store.create_gitignore()?;
        store.write_version()?;

        if store.is_stale()? {
            info!("Database is stale, syncing from journal");
            store.sync()?;
        }

        debug!(path = ?store.base_path, "Store opened");
        Ok(store)
    }

    /// Get the base path of this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the JSONL journal
    pub fn journal_path(&self) -> &Path {
        self.journal.path()
    }

    /// Get a reference to the SQLite database connection
    pub fn db(&self) -> &Connection {
        &self.db
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                position INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_position ON tasks(position);

            -- Sync metadata for staleness detection
            CREATE TABLE IF NOT EXISTS sync_metadata (
                collection TEXT PRIMARY KEY,
                last_sync_time INTEGER NOT NULL,
                file_mtime INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn create_gitignore(&self) -> Result<()> {
        let gitignore_path = self.base_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(gitignore_path, "tasklist.db\ntasklist.db-shm\ntasklist.db-wal\n")?;
        }
        Ok(())
    }

    fn write_version(&self) -> Result<()> {
        let version_path = self.base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
        }
        Ok(())
    }

    /// Check if the cache needs rebuilding from the journal
    ///
    /// Returns true if the journal has been modified since the last sync,
    /// or if it exists but has never been synced.
    pub fn is_stale(&self) -> Result<bool> {
        let Some(file_mtime) = self.journal.mtime()? else {
            return Ok(false);
        };

        let stored_mtime: Option<i64> = self
            .db
            .query_row(
                "SELECT file_mtime FROM sync_metadata WHERE collection = ?1",
                [Task::collection_name()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match stored_mtime {
            None => true,
            Some(mtime) => file_mtime > mtime,
        })
    }

    // ========================================================================
    // Task API
    // ========================================================================

    /// All tasks in insertion order
    ///
    /// Failures are logged and reported as an empty list.
    pub fn fetch_all(&self) -> Vec<Task> {
        match self.try_fetch_all() {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = ?e, "Failed to fetch tasks");
                Vec::new()
            }
        }
    }

    /// All tasks in insertion order, propagating failures
    pub fn try_fetch_all(&self) -> Result<Vec<Task>> {
        let mut stmt = self
            .db
            .prepare("SELECT id, title, position, created_at, updated_at FROM tasks
             ORDER BY position ASC, created_at ASC, id ASC")?;

        let rows = stmt.query_map([], row_to_task)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Get a task by ID
    pub fn get(&self, id: &str) -> Result<Option<Task>> {
        let task = self
            .db
            .query_row(
                "SELECT id, title, position, created_at, updated_at FROM tasks WHERE id = ?1",
                [id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    /// Create and persist a new task
    ///
    /// The title is stored as given; callers reject empty titles. The
    /// position is assigned while the write transaction holds the database,
    /// so handles on the same directory never hand out the same one.
    pub fn insert(&mut self, title: &str) -> Result<Task> {
        let task = Task::new(title);
        let id = task.id.clone();

        debug!(id = %id, "Inserting task");
        self.pending.push(Entry::Put(task));

        self.write_pending()?
            .into_iter()
            .find_map(|entry| match entry {
                Entry::Put(task) if task.id == id => Some(task),
                _ => None,
            })
            .ok_or_else(|| eyre!("Inserted task missing from flush: {}", id))
    }

    /// Change the title of an existing task and persist it
    ///
    /// Identity and position are kept from the stored record.
    pub fn rename(&mut self, task: &Task, new_title: &str) -> Result<Task> {
        let existing = self
            .get(&task.id)?
            .ok_or_else(|| eyre!("Task not found: {}", task.id))?;

        let renamed = Task {
            title: new_title.to_string(),
            updated_at: now_ms().max(existing.updated_at),
            ..existing
        };

        debug!(id = %renamed.id, "Renaming task");
        self.pending.push(Entry::Put(renamed.clone()));
        self.flush()?;

        Ok(renamed)
    }

    /// Remove a task and persist the removal
    pub fn delete(&mut self, task: &Task) -> Result<()> {
        let existing = self
            .get(&task.id)?
            .ok_or_else(|| eyre!("Task not found: {}", task.id))?;

        let tombstone = Tombstone::new(&existing.id, now_ms().max(existing.updated_at));

        debug!(id = %existing.id, "Deleting task");
        self.pending.push(Entry::Delete(tombstone));
        self.flush()?;

        Ok(())
    }

    /// Whether there are staged changes not yet flushed
    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Write staged changes to the journal and the cache
    ///
    /// A no-op when nothing is staged. Staged changes are consumed even when
    /// the write fails.
    pub fn flush(&mut self) -> Result<()> {
        self.write_pending()?;
        Ok(())
    }

    /// Flush and hand back the written entries with positions filled in
    fn write_pending(&mut self) -> Result<Vec<Entry<Task>>> {
        if self.pending.is_empty() {
            debug!("Nothing to flush");
            return Ok(Vec::new());
        }

        let mut entries = std::mem::take(&mut self.pending);

        // Immediate takes the write lock up front, so MAX(position) cannot
        // race another connection
        let tx = self
            .db
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to begin write transaction")?;
        for entry in &mut entries {
            match entry {
                Entry::Put(task) if task.position == UNASSIGNED_POSITION => {
                    task.position = next_position(&tx)?;
                }
                _ => {}
            }
            apply_entry(&tx, entry)?;
        }

        self.journal.append(&entries)?;

        if let Some(mtime) = self.journal.mtime()? {
            record_sync(&tx, mtime)?;
        }
        tx.commit().context("Failed to commit task changes")?;

        debug!(count = entries.len(), "Flushed task changes");
        Ok(entries)
    }

    // ========================================================================
    // Sync operations
    // ========================================================================

    /// Rebuild the SQLite cache from the journal
    pub fn sync(&mut self) -> Result<()> {
        info!("Syncing database from journal");

        self.flush()?;

        let records = self.journal.replay::<Task>()?;
        let file_mtime = self.journal.mtime()?.unwrap_or(0);

        let tx = self.db.transaction()?;
        tx.execute("DELETE FROM tasks", [])?;

        for task in records.into_values() {
            apply_entry(&tx, &Entry::Put(task))?;
        }

        record_sync(&tx, file_mtime)?;
        tx.commit()?;

        info!("Sync complete");
        Ok(())
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        position: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn next_position(tx: &Transaction<'_>) -> Result<i64> {
    let max: i64 = tx.query_row("SELECT COALESCE(MAX(position), 0) FROM tasks", [], |row| row.get(0))?;
    Ok(max + 1)
}

fn apply_entry(tx: &Transaction<'_>, entry: &Entry<Task>) -> Result<()> {
    match entry {
        Entry::Put(task) => {
            tx.execute(
                "INSERT OR REPLACE INTO tasks (id, title, position, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![task.id, task.title, task.position, task.created_at, task.updated_at],
            )?;
        }
        Entry::Delete(tombstone) => {
            tx.execute("DELETE FROM tasks WHERE id = ?1", [&tombstone.id])?;
        }
    }
    Ok(())
}

fn record_sync(tx: &Transaction<'_>, file_mtime: i64) -> Result<()> {
    tx.execute(
        "INSERT OR REPLACE INTO sync_metadata (collection, last_sync_time, file_mtime)
         VALUES (?1, ?2, ?3)",
        rusqlite::params![Task::collection_name(), now_ms(), file_mtime],
    )?;
    Ok(())
}
