use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{SnapshotStore, StoreError};
use crate::session::is_valid_session_id;
use crate::snapshot::Snapshot;

/// One `<dir>/<session>.json` per session
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_session_id(session_id) {
            return Err(StoreError::Backend(format!("invalid session id {:?}", session_id)));
        }
        Ok(self.dir.join(format!("{}.json", session_id)))
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn load(&self, session_id: &str) -> Result<Option<Snapshot>, StoreError> {
        let path = self.path_for(session_id)?;
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupt {
            session_id: session_id.to_string(),
            detail: e.to_string(),
        })?;
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let path = self.path_for(&snapshot.session_id)?;
        fs::create_dir_all(&self.dir).await?;

        let body = serde_json::to_vec_pretty(snapshot)?;
        let tmp = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);

        // rename is an atomic replace on the same filesystem
        fs::rename(&tmp, &path).await?;
        log::debug!("Saved snapshot {} to {}", snapshot.session_id, path.display());
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            match name.strip_suffix(".json") {
                Some(id) if is_valid_session_id(id) => ids.push(id.to_string()),
                _ => {}
            }
        }
        ids.sort();
        Ok(ids)
    }
}
