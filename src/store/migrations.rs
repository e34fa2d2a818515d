//! Schema setup and probe-and-patch migration for the `tasks` table.
//!
//! There is no version table. Each optional column is probed with a
//! `SELECT`; a probe that fails to prepare means the column is missing and
//! it is added with `ALTER TABLE`. Columns are only ever added, so running
//! this against an up-to-date table is a no-op.

use libsql::Connection;
use tracing::{debug, warn};

use crate::error::DatabaseError;

const CREATE_TASKS: &str = r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        done INTEGER DEFAULT 0,
        date_start TEXT,
        date_end TEXT
    )
"#;

/// Columns that older images may lack.
const OPTIONAL_COLUMNS: &[&str] = &["date_start", "date_end"];

/// First 16 bytes of every SQLite database image.
const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Create the `tasks` table if it does not exist.
pub async fn create_schema(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(CREATE_TASKS, ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to create tasks table: {e}")))?;
    Ok(())
}

/// Bring the `tasks` table up to the current column set.
pub async fn ensure_schema(conn: &Connection) -> Result<(), DatabaseError> {
    if !table_exists(conn, "tasks").await? {
        warn!("Snapshot has no tasks table, creating it");
        create_schema(conn).await?;
        return Ok(());
    }

    for column in OPTIONAL_COLUMNS {
        if column_present(conn, column).await {
            continue;
        }
        conn.execute(&format!("ALTER TABLE tasks ADD COLUMN {column} TEXT"), ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("Failed to add column {column}: {e}")))?;
        warn!(column, "Migrated tasks table, added missing column");
    }

    debug!("Schema check complete");
    Ok(())
}

/// Reject bytes that cannot be a database image before handing them to the engine.
pub fn check_image(image: &[u8]) -> Result<(), DatabaseError> {
    if image.len() < SQLITE_MAGIC.len() || &image[..SQLITE_MAGIC.len()] != SQLITE_MAGIC {
        return Err(DatabaseError::Snapshot(format!(
            "not a database image ({} bytes)",
            image.len()
        )));
    }
    Ok(())
}

async fn table_exists(conn: &Connection, name: &str) -> Result<bool, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            libsql::params![name],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to check for table {name}: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to read table check: {e}")))?;

    match row {
        Some(row) => {
            let count: i64 = row.get(0).unwrap_or(0);
            Ok(count > 0)
        }
        None => Ok(false),
    }
}

async fn column_present(conn: &Connection, column: &str) -> bool {
    match conn
        .query(&format!("SELECT {column} FROM tasks LIMIT 1"), ())
        .await
    {
        Ok(mut rows) => rows.next().await.is_ok(),
        Err(_) => false,
    }
}
