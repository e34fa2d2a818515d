//! Error types for tasklist.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),
}

impl Error {
    /// Stable, machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Database(DatabaseError::NotInitialized) => "not_initialized",
            Self::Database(DatabaseError::Initialization(_)) => "initialization",
            Self::Database(DatabaseError::Query(_)) => "query",
            Self::Database(DatabaseError::Migration(_)) => "migration",
            Self::Database(DatabaseError::Snapshot(_)) => "snapshot_image",
            Self::Snapshot(SnapshotError::NotFound { .. }) => "not_found",
            Self::Snapshot(SnapshotError::QuotaExceeded { .. }) => "quota_exceeded",
            Self::Snapshot(SnapshotError::Persist(_)) => "persist",
            Self::Snapshot(SnapshotError::Load(_)) => "load",
            Self::Task(TaskError::NotFound { .. }) => "task_not_found",
            Self::Task(_) => "validation",
            Self::Csv(_) => "csv",
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Relational store errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database not initialized")]
    NotInitialized,

    #[error("Failed to initialize database: {0}")]
    Initialization(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Snapshot image error: {0}")]
    Snapshot(String),
}

/// Durable snapshot store errors.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("No saved snapshot found under key {key}")]
    NotFound { key: String },

    /// The write was rejected for space. Exporting and clearing old data frees it.
    #[error("Storage quota exceeded ({size} bytes, quota {quota:?}); export and clear old data")]
    QuotaExceeded { size: usize, quota: Option<usize> },

    #[error("Persist failed: {0}")]
    Persist(String),

    #[error("Load failed: {0}")]
    Load(String),
}

impl SnapshotError {
    /// Whether a load failed only because nothing was ever saved.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Task validation and lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task title is empty")]
    EmptyTitle,

    #[error("Task title is too long: {len} > {max} characters")]
    TitleTooLong { len: usize, max: usize },

    #[error("Task #{id} not found")]
    NotFound { id: i64 },
}

/// CSV interchange errors.
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("CSV file is empty or invalid")]
    Empty,

    #[error("No tasks imported ({errors} errors)")]
    NothingImported { errors: usize },

    #[error("CSV read failed: {0}")]
    Read(String),

    #[error("CSV write failed: {0}")]
    Write(String),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
