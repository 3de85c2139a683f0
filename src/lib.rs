// tasklist - single-screen to-do list over a SQLite+JSONL store

pub mod config;
pub mod interactive;
pub mod journal;
pub mod models;
pub mod record;
pub mod screen;
pub mod store;

// Re-export main types for convenience
pub use config::Config;
pub use models::{Task, now_ms};
pub use record::Record;
pub use screen::{ListScreen, PromptResult, Reconcile, ScreenEvent};
pub use store::Store;
