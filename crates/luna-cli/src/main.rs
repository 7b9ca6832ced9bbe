mod chat;
mod setup;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use luna_core::{Credentials, InMemoryStore, KeyValueStore, LunaConfig, SqliteStore};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "luna", about = "Cycle-aware menstrual health chat in your terminal")]
struct Cli {
    /// Show assistant replies as plain text
    #[arg(long)]
    no_markdown: bool,
    /// Forget the stored cycle setup before starting
    #[arg(long)]
    reset_setup: bool,
}

/// The TUI owns stdout, so logs go to `~/.luna/luna.log`. Filter with `LUNA_LOG`.
fn init_logging() {
    let dir = LunaConfig::resolve_path("");
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("luna.log"))
    else {
        return;
    };
    let filter = EnvFilter::try_from_env("LUNA_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

/// SQLite at `db_path`, or a session-only store if it cannot be opened.
async fn open_store(db_path: &Path) -> Arc<dyn KeyValueStore> {
    match SqliteStore::open(db_path).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(
                path = %db_path.display(),
                error = %format!("{e:#}"),
                "cannot open setup database, setup will not be remembered"
            );
            Arc::new(InMemoryStore::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_logging();

    let config = LunaConfig::load().unwrap_or_else(|e| {
        warn!(error = %format!("{e:#}"), "ignoring unreadable config, using defaults");
        LunaConfig::default()
    });
    let creds = match Credentials::load()? {
        Some(c) if c.is_configured() => c,
        _ => setup::run_setup()?,
    };

    let store = open_store(&config.db_path).await;

    let opts = chat::RunOptions {
        markdown: config.render_markdown && !cli.no_markdown,
        reset_setup: cli.reset_setup,
    };
    chat::run(config, creds, store, opts).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_sqlite_file_when_possible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("luna.db");

        let store = open_store(&path).await;
        store.set_many(&[("cycleLength", "28")]).await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn falls_back_to_memory_when_database_cannot_open() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("file");
        std::fs::write(&not_a_dir, "x").unwrap();
        let path = not_a_dir.join("luna.db");

        let store = open_store(&path).await;
        store.set_many(&[("cycleLength", "31")]).await.unwrap();

        assert_eq!(store.get("cycleLength").await.unwrap().as_deref(), Some("31"));
        assert!(!path.exists());
    }
}
