//! `TaskStore` trait: the CRUD surface callers use once an engine is loaded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::tasks::model::Task;

/// Backend-agnostic task CRUD.
///
/// Every method fails with [`DatabaseError::NotInitialized`] when no engine
/// is loaded.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All rows in storage order.
    async fn list_all(&self) -> Result<Vec<Task>, DatabaseError>;

    /// A single row by id.
    async fn get(&self, id: i64) -> Result<Option<Task>, DatabaseError>;

    /// Insert a row. The title is trimmed. Returns the assigned id.
    async fn insert(
        &self,
        title: &str,
        done: bool,
        date_start: Option<DateTime<Utc>>,
        date_end: Option<DateTime<Utc>>,
    ) -> Result<i64, DatabaseError>;

    /// Set the done flag. Marking done stamps `date_end` (now, unless one is
    /// given); marking not done clears it. Returns whether a row matched.
    async fn update(
        &self,
        id: i64,
        done: bool,
        date_end: Option<DateTime<Utc>>,
    ) -> Result<bool, DatabaseError>;

    /// Delete a row. Returns whether a row matched.
    async fn delete(&self, id: i64) -> Result<bool, DatabaseError>;

    /// Delete every row. Returns the number removed.
    async fn clear_all(&self) -> Result<usize, DatabaseError>;

    /// Serialize the whole engine to a database image.
    async fn snapshot(&self) -> Result<Vec<u8>, DatabaseError>;
}
