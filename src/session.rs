//! Task session: one engine plus the snapshot store it checkpoints into.
//!
//! Opening a session consults the snapshot store first: a saved image
//! rehydrates the engine, anything else starts a fresh one. Every mutation
//! is applied to the engine and then checkpointed with a full snapshot. A
//! failed checkpoint leaves the engine mutated and usable; the mutation is
//! only lost if the process ends before the next successful persist.
//!
//! When a saved snapshot exists but cannot be read, the session starts
//! fresh with automatic checkpoints paused, so the unreadable image is not
//! overwritten until the caller persists explicitly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{CsvError, Error, Result, TaskError};
use crate::snapshot::SnapshotStore;
use crate::store::{TaskDb, TaskStore};
use crate::tasks::csv;
use crate::tasks::model::{self, Task, validate_title};

/// How a session's engine was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOrigin {
    /// Rehydrated from a saved snapshot.
    Restored,
    /// Started empty.
    Fresh,
    /// Started empty because the saved snapshot could not be read.
    Recovered,
}

/// Outcome of a CSV import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub errors: usize,
}

pub struct TaskSession {
    db: TaskDb,
    store: Arc<dyn SnapshotStore>,
    max_title_len: usize,
    origin: SessionOrigin,
    checkpoints_paused: AtomicBool,
}

impl TaskSession {
    /// Load the saved snapshot if there is one, otherwise start fresh.
    pub async fn open(store: Arc<dyn SnapshotStore>, config: &StoreConfig) -> Result<Self> {
        let mut db = TaskDb::new();

        let origin = match store.load().await {
            Ok(image) => match db.rehydrate(&image).await {
                Ok(()) => SessionOrigin::Restored,
                Err(e) => {
                    warn!(
                        error = %e,
                        location = %store.location(),
                        "Saved snapshot is unusable, starting fresh; run save to overwrite it"
                    );
                    db.initialize().await?;
                    SessionOrigin::Recovered
                }
            },
            Err(e) if e.is_not_found() => {
                info!("No saved snapshot, starting fresh");
                db.initialize().await?;
                SessionOrigin::Fresh
            }
            Err(e) => {
                warn!(
                    error = %e,
                    location = %store.location(),
                    "Failed to load snapshot, starting fresh; run save to overwrite it"
                );
                db.initialize().await?;
                SessionOrigin::Recovered
            }
        };

        Ok(Self {
            db,
            store,
            max_title_len: config.max_title_len,
            origin,
            checkpoints_paused: AtomicBool::new(origin == SessionOrigin::Recovered),
        })
    }

    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    /// Whether mutations are kept out of the snapshot store until the next
    /// explicit [`persist`](Self::persist).
    pub fn checkpoints_paused(&self) -> bool {
        self.checkpoints_paused.load(Ordering::Relaxed)
    }

    pub fn is_ready(&self) -> bool {
        self.db.is_ready()
    }

    /// Direct access to the engine, for reads.
    pub fn db(&self) -> &TaskDb {
        &self.db
    }

    /// Every task in storage order.
    pub async fn tasks(&self) -> Result<Vec<Task>> {
        Ok(self.db.list_all().await?)
    }

    /// Validate, insert and checkpoint a new task.
    pub async fn add_task(&self, title: &str) -> Result<Task> {
        let title = validate_title(title, self.max_title_len)?;
        let date_start = model::now();
        let id = self.db.insert(&title, false, Some(date_start), None).await?;
        self.checkpoint().await?;
        Ok(Task {
            id,
            title,
            done: false,
            date_start: Some(date_start),
            date_end: None,
        })
    }

    /// Mark a task done or not done, then checkpoint. A task already in the
    /// requested state is returned unchanged, keeping its completion date.
    pub async fn set_done(&self, id: i64, done: bool) -> Result<Task> {
        let task = self.require(id).await?;
        if task.done == done {
            return Ok(task);
        }
        if !self.db.update(id, done, None).await? {
            return Err(TaskError::NotFound { id }.into());
        }
        self.checkpoint().await?;
        self.require(id).await
    }

    /// Flip a task's done flag, then checkpoint.
    pub async fn toggle(&self, id: i64) -> Result<Task> {
        let task = self.require(id).await?;
        self.set_done(id, !task.done).await
    }

    /// Delete a task, then checkpoint.
    pub async fn delete_task(&self, id: i64) -> Result<()> {
        if !self.db.delete(id).await? {
            return Err(TaskError::NotFound { id }.into());
        }
        self.checkpoint().await
    }

    /// Delete every task, then checkpoint. Returns how many were removed.
    pub async fn clear_all(&self) -> Result<usize> {
        let removed = self.db.clear_all().await?;
        self.checkpoint().await?;
        Ok(removed)
    }

    /// Insert every usable row of `text`, then checkpoint once.
    pub async fn import_csv(&self, text: &str) -> Result<ImportSummary> {
        let parsed = csv::parse(text, model::now(), self.max_title_len)?;
        let mut summary = ImportSummary {
            imported: 0,
            errors: parsed.errors,
        };

        for row in parsed.rows {
            match self
                .db
                .insert(&row.title, row.done, Some(row.date_start), row.date_end)
                .await
            {
                Ok(_) => summary.imported += 1,
                Err(e) => {
                    warn!(error = %e, title = %row.title, "Failed to import row");
                    summary.errors += 1;
                }
            }
        }

        if summary.imported == 0 {
            return Err(CsvError::NothingImported {
                errors: summary.errors,
            }
            .into());
        }

        self.checkpoint().await?;
        info!(imported = summary.imported, errors = summary.errors, "CSV import complete");
        Ok(summary)
    }

    /// All tasks as CSV text.
    pub async fn export_csv(&self) -> Result<String> {
        Ok(csv::export(&self.tasks().await?))
    }

    /// Write a full snapshot of the engine to the store. Resumes automatic
    /// checkpoints once the write succeeds.
    pub async fn persist(&self) -> Result<()> {
        let image = self.db.snapshot().await?;
        self.store.persist(&image).await.map_err(|e| {
            warn!(error = %e, "Checkpoint failed");
            Error::from(e)
        })?;
        if self.checkpoints_paused.swap(false, Ordering::Relaxed) {
            info!(location = %self.store.location(), "Snapshot overwritten, checkpoints resumed");
        }
        Ok(())
    }

    /// Persist after a mutation, unless checkpoints are paused.
    async fn checkpoint(&self) -> Result<()> {
        if self.checkpoints_paused() {
            debug!("Checkpoint skipped, saved snapshot is protected until save");
            return Ok(());
        }
        self.persist().await
    }

    /// Release the engine. The snapshot store is left as last persisted.
    pub fn close(&mut self) {
        self.db.close();
    }

    async fn require(&self, id: i64) -> Result<Task> {
        self.db
            .get(id)
            .await?
            .ok_or_else(|| TaskError::NotFound { id }.into())
    }
}
