//! Snapshot Stores
//!
//! Pluggable key-value persistence for session snapshots, keyed by session
//! id. A save replaces the whole snapshot.
//!
//! ## Drivers
//! - `memory`: process-local map, lost on restart
//! - `file`: one JSON document per session under a data directory
//!
//! A Postgres driver lives in the server crate.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::snapshot::Snapshot;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("corrupt snapshot for session {session_id}: {detail}")]
    Corrupt { session_id: String, detail: String },
}

/// Durable storage for per-session snapshots.
///
/// Implementations must be `Send + Sync + 'static` so a single store can sit
/// behind an `Arc` in server state and be awaited from any task.
#[async_trait]
pub trait SnapshotStore: Send + Sync + 'static {
    /// `Ok(None)` when the session has never been initialized
    async fn load(&self, session_id: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Replace the stored snapshot for `snapshot.session_id`
    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Known session ids, sorted
    async fn list_sessions(&self) -> Result<Vec<String>, StoreError>;
}
