//! Durable snapshot store: keeps one opaque database image under a fixed key.
//!
//! The model is full overwrite: every `persist` replaces the previous image,
//! there is no diffing, versioning, or history.

pub mod libsql_store;
pub mod memory;

use async_trait::async_trait;

use crate::error::SnapshotError;

pub use libsql_store::LibSqlSnapshotStore;
pub use memory::MemorySnapshotStore;

/// Durable key-value home for the serialized task database.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Write `snapshot` under the store's key, replacing any previous value.
    ///
    /// Fails with [`SnapshotError::QuotaExceeded`] when the write is rejected
    /// for space, [`SnapshotError::Persist`] otherwise.
    async fn persist(&self, snapshot: &[u8]) -> Result<(), SnapshotError>;

    /// Read the saved snapshot.
    ///
    /// Fails with [`SnapshotError::NotFound`] when nothing was ever saved,
    /// [`SnapshotError::Load`] on I/O failure.
    async fn load(&self) -> Result<Vec<u8>, SnapshotError>;

    /// Where snapshots live, for log messages.
    fn location(&self) -> String;
}

/// Reject a snapshot that would not fit under `quota`.
pub(crate) fn check_quota(size: usize, quota: Option<usize>) -> Result<(), SnapshotError> {
    match quota {
        Some(limit) if size > limit => Err(SnapshotError::QuotaExceeded { size, quota }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_boundaries() {
        assert!(check_quota(10, None).is_ok());
        assert!(check_quota(10, Some(10)).is_ok());
        assert!(matches!(
            check_quota(11, Some(10)),
            Err(SnapshotError::QuotaExceeded {
                size: 11,
                quota: Some(10)
            })
        ));
    }
}
