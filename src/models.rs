// Data models for the task list

use crate::record::Record;
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Position of a task the store has not yet placed
pub const UNASSIGNED_POSITION: i64 = 0;

/// A titled to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    /// Insertion order, assigned by the store when the task is first written
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// Build a fresh task with a store-assigned identity
    pub(crate) fn new(title: &str) -> Self {
        let now = now_ms();
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            title: title.to_string(),
            position: UNASSIGNED_POSITION,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn created_local(&self) -> Option<DateTime<Local>> {
        Local.timestamp_millis_opt(self.created_at).single()
    }

    pub fn updated_local(&self) -> Option<DateTime<Local>> {
        Local.timestamp_millis_opt(self.updated_at).single()
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "tasks"
    }
}

/// Helper function to get current timestamp in milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
