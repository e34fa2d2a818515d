//! Process-local snapshot store. Nothing survives the process; useful for
//! ephemeral sessions and tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SnapshotError;
use crate::snapshot::{SnapshotStore, check_quota};

pub struct MemorySnapshotStore {
    key: String,
    quota: Option<usize>,
    slot: RwLock<Option<Vec<u8>>>,
}

impl MemorySnapshotStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            quota: None,
            slot: RwLock::new(None),
        }
    }

    /// Builder: reject snapshots larger than `bytes`.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Size of the stored snapshot, if any.
    pub async fn stored_len(&self) -> Option<usize> {
        self.slot.read().await.as_ref().map(Vec::len)
    }
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new("database")
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn persist(&self, snapshot: &[u8]) -> Result<(), SnapshotError> {
        check_quota(snapshot.len(), self.quota)?;
        *self.slot.write().await = Some(snapshot.to_vec());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<u8>, SnapshotError> {
        self.slot
            .read()
            .await
            .clone()
            .ok_or_else(|| SnapshotError::NotFound {
                key: self.key.clone(),
            })
    }

    fn location(&self) -> String {
        format!("memory:{}", self.key)
    }
}
