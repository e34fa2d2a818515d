//! Filtered and sorted views over a task list.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::tasks::model::Task;

/// Which tasks a view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TaskFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => task.is_active(),
            Self::Completed => task.done,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All Tasks",
            Self::Active => "Active Tasks",
            Self::Completed => "Completed Tasks",
        }
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(format!("unknown filter: {other}")),
        }
    }
}

/// Per-filter totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub all: usize,
    pub active: usize,
    pub completed: usize,
}

impl TaskCounts {
    pub fn of(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|t| t.done).count();
        Self {
            all: tasks.len(),
            active: tasks.len() - completed,
            completed,
        }
    }
}

/// Sortable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Id,
    Title,
    DateStart,
    DateEnd,
}

impl SortColumn {
    fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::DateStart => "date_start",
            Self::DateEnd => "date_end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Column plus direction, written as `<column>-<asc|desc>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSort {
    pub column: SortColumn,
    pub order: SortOrder,
}

impl Default for TaskSort {
    fn default() -> Self {
        Self {
            column: SortColumn::Id,
            order: SortOrder::Desc,
        }
    }
}

impl TaskSort {
    /// Clicking the current column flips direction; a new column starts
    /// descending so the newest or largest values come first.
    pub fn toggled(self, column: SortColumn) -> Self {
        if self.column == column {
            Self {
                column,
                order: self.order.flipped(),
            }
        } else {
            Self {
                column,
                order: SortOrder::Desc,
            }
        }
    }

    /// Compare two tasks. Missing values sort last in either direction.
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ord = match self.column {
            SortColumn::Id => a.id.cmp(&b.id),
            SortColumn::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortColumn::DateStart => return nulls_last(a.date_start, b.date_start, self.order),
            SortColumn::DateEnd => return nulls_last(a.date_end, b.date_end, self.order),
        };
        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => a.cmp(&b),
            SortOrder::Desc => b.cmp(&a),
        },
    }
}

impl fmt::Display for TaskSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self.order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        write!(f, "{}-{}", self.column.as_str(), order)
    }
}

impl FromStr for TaskSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, order) = s
            .rsplit_once('-')
            .ok_or_else(|| format!("expected <column>-<asc|desc>, got {s}"))?;
        let column = match column {
            "id" => SortColumn::Id,
            "title" => SortColumn::Title,
            "date_start" => SortColumn::DateStart,
            "date_end" => SortColumn::DateEnd,
            other => return Err(format!("unknown sort column: {other}")),
        };
        let order = match order {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            other => return Err(format!("unknown sort order: {other}")),
        };
        Ok(Self { column, order })
    }
}

/// Filter then sort a copy of `tasks`.
pub fn select(tasks: &[Task], filter: TaskFilter, sort: TaskSort) -> Vec<Task> {
    let mut selected: Vec<Task> = tasks.iter().filter(|t| filter.matches(t)).cloned().collect();
    selected.sort_by(|a, b| sort.compare(a, b));
    selected
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn task(id: i64, title: &str, done: bool, start_day: Option<u32>, end_day: Option<u32>) -> Task {
        let day = |d: u32| Utc.with_ymd_and_hms(2025, 1, d, 12, 0, 0).unwrap();
        Task {
            id,
            title: title.into(),
            done,
            date_start: start_day.map(day),
            date_end: end_day.map(day),
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task(1, "banana", false, Some(3), None),
            task(2, "Apple", true, Some(1), Some(5)),
            task(3, "cherry", true, None, Some(2)),
        ]
    }

    fn ids(tasks: &[Task]) -> Vec<i64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn default_sort_is_newest_id_first() {
        let view = select(&sample(), TaskFilter::All, TaskSort::default());
        assert_eq!(ids(&view), vec![3, 2, 1]);
    }

    #[test]
    fn filters_and_counts() {
        let tasks = sample();
        assert_eq!(ids(&select(&tasks, TaskFilter::Active, TaskSort::default())), vec![1]);
        assert_eq!(ids(&select(&tasks, TaskFilter::Completed, TaskSort::default())), vec![3, 2]);
        assert_eq!(
            TaskCounts::of(&tasks),
            TaskCounts {
                all: 3,
                active: 1,
                completed: 2
            }
        );
    }

    #[test]
    fn title_sort_ignores_case() {
        let sort: TaskSort = "title-asc".parse().unwrap();
        assert_eq!(ids(&select(&sample(), TaskFilter::All, sort)), vec![2, 1, 3]);
    }

    #[test]
    fn missing_dates_sort_last_both_ways() {
        let asc: TaskSort = "date_start-asc".parse().unwrap();
        assert_eq!(ids(&select(&sample(), TaskFilter::All, asc)), vec![2, 1, 3]);
        let desc: TaskSort = "date_start-desc".parse().unwrap();
        assert_eq!(ids(&select(&sample(), TaskFilter::All, desc)), vec![1, 2, 3]);
        let end_asc: TaskSort = "date_end-asc".parse().unwrap();
        assert_eq!(ids(&select(&sample(), TaskFilter::All, end_asc)), vec![3, 2, 1]);
    }

    #[test]
    fn toggling_flips_or_resets() {
        let sort = TaskSort::default();
        let flipped = sort.toggled(SortColumn::Id);
        assert_eq!(flipped.to_string(), "id-asc");
        let other = flipped.toggled(SortColumn::Title);
        assert_eq!(other.to_string(), "title-desc");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("id".parse::<TaskSort>().is_err());
        assert!("size-asc".parse::<TaskSort>().is_err());
        assert!("id-up".parse::<TaskSort>().is_err());
        assert!("someday".parse::<TaskFilter>().is_err());
    }

    #[test]
    fn filter_labels() {
        assert_eq!(TaskFilter::Completed.label(), "Completed Tasks");
        assert_eq!("done".parse::<TaskFilter>().unwrap(), TaskFilter::Completed);
    }
}
