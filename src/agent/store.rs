//! Run persistence keyed by run id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::record::RunRecord;
use crate::error::ScouterError;

/// Storage abstraction for run records.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn save(&self, run_id: &str, record: &RunRecord) -> Result<(), ScouterError>;
    async fn load(&self, run_id: &str) -> Result<Option<RunRecord>, ScouterError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    records: RwLock<HashMap<String, RunRecord>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn save(&self, run_id: &str, record: &RunRecord) -> Result<(), ScouterError> {
        self.records
            .write()
            .await
            .insert(run_id.to_string(), record.clone());
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<RunRecord>, ScouterError> {
        Ok(self.records.read().await.get(run_id).cloned())
    }
}

/// One pretty-printed JSON file per run under `base_dir`.
#[derive(Debug, Clone)]
pub struct FileRunStore {
    base_dir: PathBuf,
}

impl FileRunStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, run_id: &str) -> Result<PathBuf, ScouterError> {
        let name = encode_id(run_id)
            .ok_or_else(|| ScouterError::Persistence(format!("invalid run id '{run_id}'")))?;
        Ok(self.base_dir.join(format!("{name}.json")))
    }
}

#[async_trait]
impl RunStore for FileRunStore {
    async fn save(&self, run_id: &str, record: &RunRecord) -> Result<(), ScouterError> {
        let path = self.record_path(run_id)?;
        tokio::fs::create_dir_all(&self.base_dir).await?;
        tokio::fs::write(&path, record.to_json()?).await?;
        debug!(run_id, path = %path.display(), "Saved run record");
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<RunRecord>, ScouterError> {
        let path = self.record_path(run_id)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        RunRecord::from_json(&raw).map(Some)
    }
}

/// File stem for a run id: `[A-Za-z0-9_-]` kept, every other byte written
/// as `%XX`. Distinct ids always get distinct stems. `None` for an empty id.
fn encode_id(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    Some(out)
}
