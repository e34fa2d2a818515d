//! Tasks: data model, list views and CSV interchange.

pub mod csv;
pub mod model;
pub mod view;

pub use model::Task;
pub use view::{SortColumn, SortOrder, TaskCounts, TaskFilter, TaskSort};
