use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{SnapshotStore, StoreError};
use crate::snapshot::Snapshot;

/// In-process snapshot map
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: RwLock<HashMap<String, Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self, session_id: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.snapshots.read().get(session_id).cloned())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.snapshots
            .write()
            .insert(snapshot.session_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self.snapshots.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
