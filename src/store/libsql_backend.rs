//! libSQL backend: the in-process engine that holds the task table.
//!
//! A `TaskDb` starts unloaded. `initialize()` builds a fresh in-memory
//! engine; `rehydrate()` builds one from a saved database image. Either
//! replaces whatever engine was loaded before, and `close()` releases it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::TaskStore;
use crate::tasks::model::{self, Task};

const TASK_COLUMNS: &str = "id, title, done, date_start, date_end";

/// A loaded engine.
struct Engine {
    conn: Connection,
    #[allow(dead_code)]
    db: LibSqlDatabase,
    /// Backing directory of a rehydrated image, removed on drop.
    _scratch: Option<TempDir>,
}

/// Handle to the task database. Owned by a session and passed explicitly.
#[derive(Default)]
pub struct TaskDb {
    engine: Option<Engine>,
}

impl TaskDb {
    /// An unloaded handle. Every operation fails with `NotInitialized` until
    /// `initialize()` or `rehydrate()` succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a handle with a fresh engine.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let mut db = Self::new();
        db.initialize().await?;
        Ok(db)
    }

    /// Whether an engine is loaded.
    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    /// Load a fresh, empty in-memory engine and create the task table.
    pub async fn initialize(&mut self) -> Result<(), DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Initialization(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db.connect().map_err(|e| {
            DatabaseError::Initialization(format!("Failed to create connection: {e}"))
        })?;

        migrations::create_schema(&conn).await?;
        migrations::ensure_schema(&conn).await?;

        self.replace(Engine {
            conn,
            db,
            _scratch: None,
        });
        info!("Task database initialized");
        Ok(())
    }

    /// Load an engine from a database image produced by [`TaskStore::snapshot`],
    /// then bring its schema up to date.
    pub async fn rehydrate(&mut self, image: &[u8]) -> Result<(), DatabaseError> {
        migrations::check_image(image)?;

        let scratch = tempfile::Builder::new()
            .prefix("tasklist-")
            .tempdir()
            .map_err(|e| {
                DatabaseError::Initialization(format!("Failed to create scratch directory: {e}"))
            })?;
        let path = scratch.path().join("tasks.db");
        tokio::fs::write(&path, image).await.map_err(|e| {
            DatabaseError::Initialization(format!("Failed to write database image: {e}"))
        })?;

        let db = libsql::Builder::new_local(&path)
            .build()
            .await
            .map_err(|e| DatabaseError::Snapshot(format!("Failed to open database image: {e}")))?;

        let conn = db.connect().map_err(|e| {
            DatabaseError::Initialization(format!("Failed to create connection: {e}"))
        })?;

        // The header check only covers 16 bytes; make the engine read the schema now.
        let mut rows = conn
            .query("SELECT COUNT(*) FROM sqlite_master", ())
            .await
            .map_err(|e| DatabaseError::Snapshot(format!("Unreadable database image: {e}")))?;
        rows.next()
            .await
            .map_err(|e| DatabaseError::Snapshot(format!("Unreadable database image: {e}")))?;
        drop(rows);

        migrations::ensure_schema(&conn).await?;

        self.replace(Engine {
            conn,
            db,
            _scratch: Some(scratch),
        });
        info!(bytes = image.len(), "Task database rehydrated from snapshot");
        Ok(())
    }

    /// Run the additive column migration on the loaded engine.
    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        migrations::ensure_schema(self.conn()?).await
    }

    /// Release the engine. Later calls fail with `NotInitialized`.
    pub fn close(&mut self) {
        if self.engine.take().is_some() {
            info!("Task database closed");
        }
    }

    fn replace(&mut self, engine: Engine) {
        if self.engine.replace(engine).is_some() {
            debug!("Replaced previously loaded engine");
        }
    }

    fn conn(&self) -> Result<&Connection, DatabaseError> {
        self.engine
            .as_ref()
            .map(|e| &e.conn)
            .ok_or(DatabaseError::NotInitialized)
    }
}

fn opt_timestamp(dt: Option<DateTime<Utc>>) -> libsql::Value {
    match dt {
        Some(dt) => libsql::Value::Text(model::format_timestamp(&dt)),
        None => libsql::Value::Null,
    }
}

/// Read an optional timestamp column. Text that does not parse is an error
/// naming the row, never a silent `None`.
fn date_column(
    row: &libsql::Row,
    idx: i32,
    id: i64,
    column: &str,
) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match row.get_value(idx) {
        Ok(libsql::Value::Null) => Ok(None),
        Ok(libsql::Value::Text(raw)) if raw.trim().is_empty() => Ok(None),
        Ok(libsql::Value::Text(raw)) => model::parse_timestamp(&raw).map(Some).ok_or_else(|| {
            DatabaseError::Query(format!("task #{id} {column}: unrecognised timestamp '{raw}'"))
        }),
        Ok(other) => Err(DatabaseError::Query(format!(
            "task #{id} {column}: expected text, got {other:?}"
        ))),
        Err(e) => Err(DatabaseError::Query(format!("task #{id} {column}: {e}"))),
    }
}

/// Map a positional row (TASK_COLUMNS order) to a Task.
fn row_to_task(row: &libsql::Row) -> Result<Task, DatabaseError> {
    let id: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("task.id: {e}")))?;
    let title: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("task.title: {e}")))?;
    let done = match row.get_value(2) {
        Ok(libsql::Value::Integer(flag)) => flag != 0,
        Ok(libsql::Value::Null) => false,
        Ok(other) => {
            return Err(DatabaseError::Query(format!(
                "task #{id} done: expected 0/1, got {other:?}"
            )));
        }
        Err(e) => return Err(DatabaseError::Query(format!("task #{id} done: {e}"))),
    };

    Ok(Task {
        id,
        title,
        done,
        date_start: date_column(row, 3, id, "date_start")?,
        date_end: date_column(row, 4, id, "date_end")?,
    })
}

#[async_trait]
impl TaskStore for TaskDb {
    async fn list_all(&self) -> Result<Vec<Task>, DatabaseError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id"), ())
            .await
            .map_err(|e| DatabaseError::Query(format!("list_all: {e}")))?;

        let mut tasks = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_all row: {e}")))?
        {
            tasks.push(row_to_task(&row)?);
        }
        debug!(count = tasks.len(), "Listed tasks");
        Ok(tasks)
    }

    async fn get(&self, id: i64) -> Result<Option<Task>, DatabaseError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_task(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get row: {e}"))),
        }
    }

    async fn insert(
        &self,
        title: &str,
        done: bool,
        date_start: Option<DateTime<Utc>>,
        date_end: Option<DateTime<Utc>>,
    ) -> Result<i64, DatabaseError> {
        let conn = self.conn()?;
        let title = title.trim();
        let mut rows = conn
            .query(
                "INSERT INTO tasks (title, done, date_start, date_end) VALUES (?1, ?2, ?3, ?4) RETURNING id",
                params![
                    title,
                    done as i64,
                    opt_timestamp(date_start),
                    opt_timestamp(date_end),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("insert row: {e}")))?
            .ok_or_else(|| DatabaseError::Query("insert returned no id".to_string()))?;
        let id: i64 = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("insert id: {e}")))?;
        debug!(id, title, "Task inserted");
        Ok(id)
    }

    async fn update(
        &self,
        id: i64,
        done: bool,
        date_end: Option<DateTime<Utc>>,
    ) -> Result<bool, DatabaseError> {
        let conn = self.conn()?;
        let date_end = if done {
            Some(date_end.unwrap_or_else(model::now))
        } else {
            None
        };

        let count = conn
            .execute(
                "UPDATE tasks SET done = ?1, date_end = ?2 WHERE id = ?3",
                params![done as i64, opt_timestamp(date_end), id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update: {e}")))?;
        debug!(id, done, matched = count > 0, "Task updated");
        Ok(count > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        let conn = self.conn()?;
        let count = conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete: {e}")))?;
        debug!(id, matched = count > 0, "Task deleted");
        Ok(count > 0)
    }

    async fn clear_all(&self) -> Result<usize, DatabaseError> {
        let conn = self.conn()?;
        let count = conn
            .execute("DELETE FROM tasks", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("clear_all: {e}")))?;
        info!(count, "All tasks cleared");
        Ok(count as usize)
    }

    async fn snapshot(&self) -> Result<Vec<u8>, DatabaseError> {
        let conn = self.conn()?;
        let scratch = tempfile::Builder::new()
            .prefix("tasklist-snapshot-")
            .tempdir()
            .map_err(|e| DatabaseError::Snapshot(format!("Failed to create scratch directory: {e}")))?;
        let path = scratch.path().join("snapshot.db");

        conn.execute(
            "VACUUM INTO ?1",
            params![path.to_string_lossy().into_owned()],
        )
        .await
        .map_err(|e| DatabaseError::Snapshot(format!("Failed to serialize database: {e}")))?;

        let image = tokio::fs::read(&path)
            .await
            .map_err(|e| DatabaseError::Snapshot(format!("Failed to read database image: {e}")))?;
        debug!(bytes = image.len(), "Database serialized");
        Ok(image)
    }
}
