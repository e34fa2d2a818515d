use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use tasklist::cli::{self, Args, Command, ViewState};
use tasklist::config::StoreConfig;
use tasklist::session::{SessionOrigin, TaskSession};
use tasklist::snapshot::{LibSqlSnapshotStore, MemorySnapshotStore, SnapshotStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let json = args.json;
    let ephemeral = args.memory;

    let config = StoreConfig::from_env().context("invalid configuration")?;

    let store: Arc<dyn SnapshotStore> = if ephemeral {
        Arc::new(MemorySnapshotStore::new(config.snapshot_key.clone()))
    } else {
        Arc::new(LibSqlSnapshotStore::new(&config))
    };

    let mut session = TaskSession::open(store, &config)
        .await
        .context("failed to open task database")?;

    eprintln!("📋 tasklist v{}", env!("CARGO_PKG_VERSION"));
    if ephemeral {
        eprintln!("   Snapshots: in memory (nothing is kept after exit)");
    } else {
        eprintln!("   Snapshots: {}", config.namespace_path().display());
    }
    match session.origin() {
        SessionOrigin::Restored => eprintln!("   Database loaded from snapshot"),
        SessionOrigin::Fresh => eprintln!("   New database initialized"),
        SessionOrigin::Recovered => {
            eprintln!("   ⚠️ Saved snapshot could not be read; started empty.");
            eprintln!("   It is left untouched until you run 'save'.");
        }
    }
    eprintln!("   Type 'help' for commands, 'quit' to exit.\n");

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break, // EOF
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });
    let mut input = Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|line| (line, rx))
    }));

    let mut view_state = ViewState::default();
    eprint!("> ");
    while let Some(line) = input.next().await {
        if line.trim().is_empty() {
            eprint!("> ");
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(usage) => {
                eprintln!("{usage}");
                eprint!("> ");
                continue;
            }
        };

        let result = cli::execute(&session, &mut view_state, command).await;
        if json {
            println!("{}", cli::render_json(result));
        } else {
            println!("{}", cli::render_text(result));
        }
        eprint!("> ");
    }

    session.close();
    Ok(())
}
