// Single list screen over the task store

use crate::models::Task;
use crate::store::Store;
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const NEW_TASK_TITLE: &str = "New Task";
pub const NEW_TASK_MESSAGE: &str = "What would you like to do?";
pub const EDIT_TASK_TITLE: &str = "Edit Task";
pub const EDIT_TASK_MESSAGE: &str = "Edit task name:";
pub const PLACEHOLDER: &str = "New Task";

/// How the in-memory rows follow a store change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reconcile {
    /// Re-read every row from the store
    #[default]
    Refetch,
    /// Patch the single changed row in place
    Splice,
}

/// What an open prompt will do when saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    Add,
    Edit { row: usize, task: Task },
}

/// Modal text-entry prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub title: &'static str,
    pub message: &'static str,
    pub placeholder: &'static str,
    /// Text the input starts with
    pub initial: String,
}

/// The user's answer to a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResult {
    Save(String),
    Cancel,
}

/// How the rows changed after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenEvent {
    Inserted(usize),
    Updated(usize),
    Removed(usize),
    /// Rows were re-read from the store
    Reloaded,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Idle,
    PromptOpen(Prompt),
}

/// The task list screen
///
/// Holds an ordered copy of the store's tasks. Store failures are logged and
/// reported as [`ScreenEvent::Unchanged`]; they never reach the user.
pub struct ListScreen {
    store: Store,
    reconcile: Reconcile,
    rows: Vec<Task>,
    mode: Mode,
}

impl ListScreen {
    pub fn new(store: Store, reconcile: Reconcile) -> Self {
        let rows = store.fetch_all();
        debug!(rows = rows.len(), ?reconcile, "List screen loaded");
        Self {
            store,
            reconcile,
            rows,
            mode: Mode::Idle,
        }
    }

    pub fn rows(&self) -> &[Task] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        match &self.mode {
            Mode::PromptOpen(prompt) => Some(prompt),
            Mode::Idle => None,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }

    /// Rows as display lines, numbered from 1
    pub fn render(&self) -> Vec<String> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, task)| format!("{:>3}. {}", i + 1, task.title))
            .collect()
    }

    /// Open the "New Task" prompt
    pub fn open_add(&mut self) -> Result<Prompt> {
        self.open(Prompt {
            kind: PromptKind::Add,
            title: NEW_TASK_TITLE,
            message: NEW_TASK_MESSAGE,
            placeholder: PLACEHOLDER,
            initial: String::new(),
        })
    }

    /// Open the "Edit Task" prompt for a row (0-based)
    pub fn open_edit(&mut self, row: usize) -> Result<Prompt> {
        let task = self.row(row)?.clone();
        let initial = task.title.clone();
        self.open(Prompt {
            kind: PromptKind::Edit { row, task },
            title: EDIT_TASK_TITLE,
            message: EDIT_TASK_MESSAGE,
            placeholder: PLACEHOLDER,
            initial,
        })
    }

    /// Show a prompt, returning a copy for the caller to present
    fn open(&mut self, prompt: Prompt) -> Result<Prompt> {
        if matches!(self.mode, Mode::PromptOpen(_)) {
            return Err(eyre!("A prompt is already open"));
        }
        debug!(title = prompt.title, "Opening prompt");
        self.mode = Mode::PromptOpen(prompt.clone());
        Ok(prompt)
    }

    /// Close the open prompt with the user's answer
    ///
    /// An empty title is dropped here and never reaches the store.
    pub fn resolve(&mut self, result: PromptResult) -> Result<ScreenEvent> {
        let prompt = match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::PromptOpen(prompt) => prompt,
            Mode::Idle => return Err(eyre!("No prompt is open")),
        };

        let text = match result {
            PromptResult::Cancel => return Ok(ScreenEvent::Unchanged),
            PromptResult::Save(text) if text.is_empty() => {
                debug!("Empty title, nothing saved");
                return Ok(ScreenEvent::Unchanged);
            }
            PromptResult::Save(text) => text,
        };

        let event = match prompt.kind {
            PromptKind::Add => self.add(&text),
            PromptKind::Edit { row, task } => self.rename(row, &task, &text),
        };
        Ok(event)
    }

    /// Delete the task at a row (0-based)
    pub fn delete(&mut self, row: usize) -> Result<ScreenEvent> {
        if matches!(self.mode, Mode::PromptOpen(_)) {
            return Err(eyre!("Cannot delete while a prompt is open"));
        }
        let task = self.row(row)?.clone();

        if let Err(e) = self.store.delete(&task) {
            warn!(id = %task.id, error = ?e, "Failed to delete task");
            return Ok(ScreenEvent::Unchanged);
        }

        Ok(match self.reconcile {
            Reconcile::Refetch => self.reload(),
            Reconcile::Splice => {
                self.rows.remove(row);
                ScreenEvent::Removed(row)
            }
        })
    }

    /// Re-read every row from the store
    pub fn reload(&mut self) -> ScreenEvent {
        self.rows = self.store.fetch_all();
        ScreenEvent::Reloaded
    }

    fn add(&mut self, title: &str) -> ScreenEvent {
        let task = match self.store.insert(title) {
            Ok(task) => task,
            Err(e) => {
                warn!(error = ?e, "Failed to save task");
                return ScreenEvent::Unchanged;
            }
        };

        match self.reconcile {
            Reconcile::Refetch => self.reload(),
            Reconcile::Splice => {
                self.rows.push(task);
                ScreenEvent::Inserted(self.rows.len() - 1)
            }
        }
    }

    fn rename(&mut self, row: usize, task: &Task, title: &str) -> ScreenEvent {
        let renamed = match self.store.rename(task, title) {
            Ok(task) => task,
            Err(e) => {
                warn!(id = %task.id, error = ?e, "Failed to rename task");
                return ScreenEvent::Unchanged;
            }
        };

        match self.reconcile {
            Reconcile::Refetch => self.reload(),
            Reconcile::Splice => match self.rows.get_mut(row) {
                Some(slot) if slot.id == renamed.id => {
                    *slot = renamed;
                    ScreenEvent::Updated(row)
                }
                _ => self.reload(),
            },
        }
    }

    fn row(&self, row: usize) -> Result<&Task> {
        self.rows
            .get(row)
            .ok_or_else(|| eyre!("Row {} out of range ({} rows)", row + 1, self.rows.len()))
    }
}
