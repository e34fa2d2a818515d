//! Terminal front end: line commands over a [`TaskSession`].

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use crate::envelope::Envelope;
use crate::error::{CsvError, Error};
use crate::session::TaskSession;
use crate::tasks::model::format_timestamp;
use crate::tasks::{Task, TaskCounts, TaskFilter, TaskSort, csv, view};

pub const HELP: &str = "\
Commands:
  list [all|active|completed] [<column>-<asc|desc>]   show tasks (columns: id, title, date_start, date_end)
  add <title>                                         add a task
  done <id> | undo <id> | toggle <id>                 change completion
  rm <id>                                             delete a task
  clear                                               delete all tasks
  export [path]                                       write tasks as CSV
  import <path>                                       read tasks from CSV
  save                                                persist now
  help | quit";

/// Command-line flags of the `tasklist` binary.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(version, about = "Task list with snapshot persistence")]
pub struct Args {
    /// Print one JSON envelope per command instead of text
    #[arg(long)]
    pub json: bool,

    /// Keep snapshots in memory; nothing is saved after exit
    #[arg(long)]
    pub memory: bool,
}

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List {
        filter: Option<TaskFilter>,
        sort: Option<TaskSort>,
    },
    Add(String),
    SetDone(i64, bool),
    Toggle(i64),
    Remove(i64),
    Clear,
    Export(Option<PathBuf>),
    Import(PathBuf),
    Save,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word {
            "list" | "ls" => {
                let mut filter = None;
                let mut sort = None;
                for arg in rest.split_whitespace() {
                    if let Ok(f) = arg.parse::<TaskFilter>() {
                        filter = Some(f);
                    } else {
                        sort = Some(arg.parse::<TaskSort>()?);
                    }
                }
                Ok(Self::List { filter, sort })
            }
            "add" if !rest.is_empty() => Ok(Self::Add(rest.to_string())),
            "add" => Err("usage: add <title>".to_string()),
            "done" => parse_id(rest).map(|id| Self::SetDone(id, true)),
            "undo" => parse_id(rest).map(|id| Self::SetDone(id, false)),
            "toggle" => parse_id(rest).map(Self::Toggle),
            "rm" | "delete" => parse_id(rest).map(Self::Remove),
            "clear" => Ok(Self::Clear),
            "export" if rest.is_empty() => Ok(Self::Export(None)),
            "export" => Ok(Self::Export(Some(PathBuf::from(rest)))),
            "import" if !rest.is_empty() => Ok(Self::Import(PathBuf::from(rest))),
            "import" => Err("usage: import <path>".to_string()),
            "save" => Ok(Self::Save),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "/quit" => Ok(Self::Quit),
            other => Err(format!("unknown command: {other} (try 'help')")),
        }
    }
}

fn parse_id(raw: &str) -> Result<i64, String> {
    raw.parse().map_err(|_| format!("expected a task id, got '{raw}'"))
}

/// Current filter and sort of the list view.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewState {
    pub filter: TaskFilter,
    pub sort: TaskSort,
}

/// What a command produced.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Message {
        #[serde(skip)]
        text: String,
    },
    Task(Task),
    Tasks {
        #[serde(skip)]
        label: String,
        counts: TaskCounts,
        tasks: Vec<Task>,
    },
}

impl Reply {
    fn message(text: impl Into<String>) -> Self {
        Self::Message { text: text.into() }
    }

    fn summary(&self) -> String {
        match self {
            Self::Message { text } => text.clone(),
            Self::Task(task) => format!("Task #{} {}", task.id, if task.done { "completed" } else { "active" }),
            Self::Tasks { label, tasks, .. } => format!("{label} ({} records)", tasks.len()),
        }
    }
}

/// Run one command against the session.
pub async fn execute(session: &TaskSession, view_state: &mut ViewState, command: Command) -> Result<Reply, Error> {
    match command {
        Command::List { filter, sort } => {
            if let Some(filter) = filter {
                view_state.filter = filter;
            }
            if let Some(sort) = sort {
                view_state.sort = sort;
            }
            let all = session.tasks().await?;
            Ok(Reply::Tasks {
                label: view_state.filter.label().to_string(),
                counts: TaskCounts::of(&all),
                tasks: view::select(&all, view_state.filter, view_state.sort),
            })
        }
        Command::Add(title) => session.add_task(&title).await.map(Reply::Task),
        Command::SetDone(id, done) => session.set_done(id, done).await.map(Reply::Task),
        Command::Toggle(id) => session.toggle(id).await.map(Reply::Task),
        Command::Remove(id) => {
            session.delete_task(id).await?;
            Ok(Reply::message(format!("Task #{id} deleted")))
        }
        Command::Clear => {
            let removed = session.clear_all().await?;
            Ok(Reply::message(format!("All tasks cleared ({removed} removed)")))
        }
        Command::Export(path) => {
            let text = session.export_csv().await?;
            let path = path.unwrap_or_else(|| PathBuf::from(csv::export_file_name(chrono::Utc::now())));
            tokio::fs::write(&path, text)
                .await
                .map_err(|e| CsvError::Write(format!("{}: {e}", path.display())))?;
            let count = session.tasks().await?.len();
            Ok(Reply::message(format!("Exported {count} tasks to {}", path.display())))
        }
        Command::Import(path) => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| CsvError::Read(format!("{}: {e}", path.display())))?;
            let summary = session.import_csv(&text).await?;
            let text = if summary.errors > 0 {
                format!("Imported {} tasks, {} errors", summary.imported, summary.errors)
            } else {
                format!("Imported {} tasks", summary.imported)
            };
            Ok(Reply::message(text))
        }
        Command::Save => {
            session.persist().await?;
            Ok(Reply::message("Database persisted"))
        }
        Command::Help => Ok(Reply::message(HELP)),
        Command::Quit => Ok(Reply::message("Bye")),
    }
}

/// Render a command result as one JSON envelope.
pub fn render_json(result: Result<Reply, Error>) -> String {
    let envelope = match result {
        Ok(Reply::Message { text }) => Envelope {
            success: true,
            message: text,
            kind: None,
            data: None,
        },
        other => Envelope::from_result(other, Reply::summary),
    };
    serde_json::to_string(&envelope).unwrap_or_else(|e| {
        format!("{{\"success\":false,\"message\":\"failed to encode reply: {e}\"}}")
    })
}

/// Render a command result for people.
pub fn render_text(result: Result<Reply, Error>) -> String {
    match result {
        Ok(Reply::Tasks { label, counts, tasks }) => {
            let mut out = format!(
                "{label} ({} records)   all {} | active {} | completed {}\n",
                tasks.len(),
                counts.all,
                counts.active,
                counts.completed
            );
            if tasks.is_empty() {
                out.push_str("  (no tasks)");
            }
            for task in &tasks {
                out.push_str(&format_row(task));
                out.push('\n');
            }
            out.trim_end().to_string()
        }
        Ok(Reply::Task(task)) => format_row(&task),
        Ok(reply) => reply.summary(),
        Err(e) => format!("error [{}]: {e}", e.kind()),
    }
}

fn format_row(task: &Task) -> String {
    let date = |d: &Option<chrono::DateTime<chrono::Utc>>| d.as_ref().map(format_timestamp).unwrap_or_else(|| "-".to_string());
    format!(
        "  [{}] #{:<4} {}  (created {}, completed {})",
        if task.done { "x" } else { " " },
        task.id,
        task.title,
        date(&task.date_start),
        date(&task.date_end),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::StoreConfig;
    use crate::snapshot::MemorySnapshotStore;
    use crate::tasks::SortColumn;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("add   Buy milk "), Ok(Command::Add("Buy milk".into())));
        assert_eq!(Command::parse("done 3"), Ok(Command::SetDone(3, true)));
        assert_eq!(Command::parse("undo 3"), Ok(Command::SetDone(3, false)));
        assert_eq!(Command::parse("rm 9"), Ok(Command::Remove(9)));
        assert_eq!(Command::parse("export"), Ok(Command::Export(None)));
        assert_eq!(Command::parse("quit"), Ok(Command::Quit));
        assert_eq!(
            Command::parse("list completed title-asc"),
            Ok(Command::List {
                filter: Some(TaskFilter::Completed),
                sort: Some("title-asc".parse().unwrap()),
            })
        );
        assert!(Command::parse("add").is_err());
        assert!(Command::parse("done x").is_err());
        assert!(Command::parse("list sideways").is_err());
        assert!(Command::parse("fly").is_err());
    }

    #[test]
    fn flags_parse_strictly() {
        let args = Args::try_parse_from(["tasklist", "--json", "--memory"]).unwrap();
        assert!(args.json && args.memory);

        let args = Args::try_parse_from(["tasklist"]).unwrap();
        assert!(!args.json && !args.memory);

        assert!(Args::try_parse_from(["tasklist", "--jsno"]).is_err());
        assert!(Args::try_parse_from(["tasklist", "extra"]).is_err());
    }

    async fn session() -> TaskSession {
        TaskSession::open(Arc::new(MemorySnapshotStore::default()), &StoreConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn list_remembers_view() {
        let session = session().await;
        let mut state = ViewState::default();
        execute(&session, &mut state, Command::Add("b".into())).await.unwrap();
        execute(&session, &mut state, Command::Add("a".into())).await.unwrap();
        execute(&session, &mut state, Command::SetDone(1, true)).await.unwrap();

        let reply = execute(
            &session,
            &mut state,
            Command::List {
                filter: Some(TaskFilter::Active),
                sort: None,
            },
        )
        .await
        .unwrap();
        match reply {
            Reply::Tasks { counts, tasks, label } => {
                assert_eq!(label, "Active Tasks");
                assert_eq!(counts.all, 2);
                assert_eq!(tasks.len(), 1);
                assert_eq!(tasks[0].title, "a");
            }
            other => panic!("unexpected reply: {other:?}"),
        }
        assert_eq!(state.filter, TaskFilter::Active);
        assert_eq!(state.sort.column, SortColumn::Id);
    }

    #[tokio::test]
    async fn export_then_import_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        let session = session().await;
        let mut state = ViewState::default();
        execute(&session, &mut state, Command::Add("Say \"hi\", twice".into())).await.unwrap();
        execute(&session, &mut state, Command::Export(Some(path.clone()))).await.unwrap();

        let other = self::session().await;
        let reply = execute(&other, &mut state, Command::Import(path)).await.unwrap();
        assert_eq!(reply.summary(), "Imported 1 tasks");
        assert_eq!(other.tasks().await.unwrap()[0].title, "Say \"hi\", twice");
    }

    #[tokio::test]
    async fn json_envelopes() {
        let session = session().await;
        let mut state = ViewState::default();
        let ok = render_json(execute(&session, &mut state, Command::Add("Buy milk".into())).await);
        let value: serde_json::Value = serde_json::from_str(&ok).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["title"], "Buy milk");

        let err = render_json(execute(&session, &mut state, Command::Remove(77)).await);
        let value: serde_json::Value = serde_json::from_str(&err).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["kind"], "task_not_found");
    }

    #[tokio::test]
    async fn text_rendering() {
        let session = session().await;
        let mut state = ViewState::default();
        let added = render_text(execute(&session, &mut state, Command::Add("Buy milk".into())).await);
        assert!(added.contains("[ ] #1"));
        assert!(added.contains("Buy milk"));

        let listed = render_text(
            execute(&session, &mut state, Command::List { filter: None, sort: None }).await,
        );
        assert!(listed.starts_with("All Tasks (1 records)"));

        let err = render_text(Err(Error::from(crate::error::TaskError::EmptyTitle)));
        assert_eq!(err, "error [validation]: Task error: Task title is empty");
    }
}
