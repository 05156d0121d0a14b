//! Dialogue persistence
//!
//! ```text
//! DialogueStore (trait)
//! ├── MemoryStore      # process-local, used by tests and the default CLI
//! └── SqliteStore      # single-file database
//! HistoryLog           # recent mutations, in memory only
//! ```

pub mod history;
pub mod memory;
pub mod query;
pub mod sqlite;

pub use history::HistoryLog;
pub use memory::MemoryStore;
pub use query::{CmpOp, Expr, ListField, NumField, TextField};
pub use sqlite::SqliteStore;

use crate::config::StorageConfig;
use crate::core::types::{Dialogue, DialogueId, DialoguePatch};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Number of distinct questions and of dialogues
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DialogueStats {
    pub questions: usize,
    pub dialogues: usize,
}

/// Store of dialogue records
///
/// Results come back in ascending id order; selection ties are broken by
/// that order.
#[async_trait]
pub trait DialogueStore: Send + Sync {
    async fn query(&self, expr: &Expr) -> Result<Vec<Dialogue>>;

    /// Records with the given ids, missing ids are skipped
    async fn get(&self, ids: &[DialogueId]) -> Result<Vec<Dialogue>>;

    /// Persist a new record, the id of `dialogue` is ignored
    async fn create(&self, dialogue: Dialogue) -> Result<Dialogue>;

    /// Apply partial updates in one batch, inserting ids that do not exist
    async fn upsert(&self, patches: Vec<DialoguePatch>) -> Result<()>;

    async fn remove(&self, ids: &[DialogueId]) -> Result<()>;

    async fn stats(&self) -> Result<DialogueStats>;
}

/// Open the store described by the configuration
pub fn open(config: &StorageConfig) -> Result<Arc<dyn DialogueStore>> {
    match &config.path {
        Some(path) => {
            tracing::info!("Opening dialogue database at {}", path.display());
            Ok(Arc::new(SqliteStore::open(path)?))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}
