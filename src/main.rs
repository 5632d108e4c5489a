use std::{path::Path, sync::Arc};

use anyhow::Context;
use tiktek::{
    TiktekResult,
    config::Config,
    repository::CatalogRepository,
    shell::{Outcome, Shell},
    storage::{self, FavoritesStore},
    tiktek_client::TiktekClient,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt::SubscriberBuilder, prelude::*};

#[tokio::main]
async fn main() -> TiktekResult<()> {
    // Respect RUST_LOG if set, default to info for our crate and warn for deps.
    let default_filter = format!(
        "{}=info,reqwest=warn,sea_orm=warn,sqlx=warn",
        env!("CARGO_PKG_NAME")
    );
    let env_filter = std::env::var("RUST_LOG").unwrap_or(default_filter);
    SubscriberBuilder::default()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish()
        .with(ErrorLayer::default())
        .init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting Tiktek");

    // Load environment variables from .env files
    if Path::new(".env.local").exists() {
        dotenvy::from_filename(".env.local")?;
    } else if Path::new(".env").exists() {
        dotenvy::from_filename(".env")?;
    };
    let config = Config::load();
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    if let Some(dir) = config.db_dir() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
    }
    let db = storage::open_database(&config.db_connection_string).await?;
    let favorites = FavoritesStore::open(db)
        .await
        .with_context(|| "Failed to load favorites")?;
    tracing::info!(count = favorites.snapshot().len(), "loaded favorites");

    let client = TiktekClient::new(&config.base_url)?;
    tracing::info!(base_url = %config.base_url, "configured Tiktek client");

    let repo = Arc::new(CatalogRepository::new(client, favorites));
    run_shell(repo).await
}

pub async fn run_shell(repo: Arc<CatalogRepository>) -> TiktekResult<()> {
    let mut shell = Shell::new(repo);
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let first = shell.start().await;
    write_screen(&mut stdout, &first).await?;

    while let Some(line) = lines.next_line().await? {
        match shell.handle_line(&line).await {
            Outcome::Continue(text) => write_screen(&mut stdout, &text).await?,
            Outcome::Quit => break,
        }
    }
    tracing::info!("bye");
    Ok(())
}

async fn write_screen(stdout: &mut tokio::io::Stdout, text: &str) -> TiktekResult<()> {
    stdout.write_all(text.as_bytes()).await?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n").await?;
    }
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;
    Ok(())
}
