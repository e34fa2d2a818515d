//! libSQL-backed snapshot store.
//!
//! The namespace is a database file `<data_dir>/<namespace>.db`, the
//! container is a `(key, value)` table inside it, and the snapshot is a
//! single BLOB row. A connection is opened for each call and dropped before
//! the call returns.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::SnapshotError;
use crate::snapshot::{SnapshotStore, check_quota};

/// SQLITE_FULL primary result code.
const SQLITE_FULL: i32 = 13;

pub struct LibSqlSnapshotStore {
    path: PathBuf,
    container: String,
    key: String,
    quota: Option<usize>,
}

impl LibSqlSnapshotStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            path: config.namespace_path(),
            container: config.container.clone(),
            key: config.snapshot_key.clone(),
            quota: config.quota_bytes,
        }
    }

    /// Path of the namespace file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the namespace, creating it and the container if needed.
    async fn open(&self) -> Result<(LibSqlDatabase, Connection), String> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create snapshot directory: {e}"))?;
        }

        let db = libsql::Builder::new_local(&self.path)
            .build()
            .await
            .map_err(|e| format!("Failed to open snapshot store: {e}"))?;
        let conn = db
            .connect()
            .map_err(|e| format!("Failed to create connection: {e}"))?;

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (key TEXT PRIMARY KEY, value BLOB NOT NULL)",
                self.container
            ),
            (),
        )
        .await
        .map_err(|e| format!("Failed to create container {}: {e}", self.container))?;

        Ok((db, conn))
    }

    fn write_error(&self, size: usize, err: libsql::Error) -> SnapshotError {
        match err {
            libsql::Error::SqliteFailure(code, _) if code & 0xff == SQLITE_FULL => {
                SnapshotError::QuotaExceeded {
                    size,
                    quota: self.quota,
                }
            }
            other => SnapshotError::Persist(other.to_string()),
        }
    }
}

#[async_trait]
impl SnapshotStore for LibSqlSnapshotStore {
    async fn persist(&self, snapshot: &[u8]) -> Result<(), SnapshotError> {
        let size = snapshot.len();
        check_quota(size, self.quota)?;

        let (_db, conn) = self.open().await.map_err(SnapshotError::Persist)?;
        conn.execute(
            &format!(
                "INSERT INTO \"{}\" (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                self.container
            ),
            params![self.key.as_str(), libsql::Value::Blob(snapshot.to_vec())],
        )
        .await
        .map_err(|e| self.write_error(size, e))?;

        info!(bytes = size, path = %self.path.display(), "Snapshot persisted");
        Ok(())
    }

    async fn load(&self) -> Result<Vec<u8>, SnapshotError> {
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| SnapshotError::Load(format!("Failed to check snapshot store: {e}")))?;
        if !exists {
            debug!(path = %self.path.display(), "No snapshot store on disk");
            return Err(SnapshotError::NotFound {
                key: self.key.clone(),
            });
        }

        let (_db, conn) = self.open().await.map_err(SnapshotError::Load)?;
        let mut rows = conn
            .query(
                &format!("SELECT value FROM \"{}\" WHERE key = ?1", self.container),
                params![self.key.as_str()],
            )
            .await
            .map_err(|e| SnapshotError::Load(format!("Failed to read snapshot: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| SnapshotError::Load(format!("Failed to read snapshot row: {e}")))?
            .ok_or_else(|| SnapshotError::NotFound {
                key: self.key.clone(),
            })?;

        match row.get_value(0) {
            Ok(libsql::Value::Blob(image)) => {
                debug!(bytes = image.len(), "Snapshot loaded");
                Ok(image)
            }
            Ok(other) => Err(SnapshotError::Load(format!(
                "Snapshot value is not binary: {other:?}"
            ))),
            Err(e) => Err(SnapshotError::Load(format!("Failed to decode snapshot: {e}"))),
        }
    }

    fn location(&self) -> String {
        format!("{}#{}/{}", self.path.display(), self.container, self.key)
    }
}
