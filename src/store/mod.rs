//! Persistence layer: the libSQL engine that owns the `tasks` table.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::TaskDb;
pub use traits::TaskStore;
