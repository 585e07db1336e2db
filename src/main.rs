//! Task Manager API
//!
//! REST backend for a personal task tracker: per-user tasks with
//! filtering, paging and dashboard statistics.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use task_manager_api::cli::{Cli, Command};
use task_manager_api::config::{Config, ConfigLoader, ConfigPaths};
use task_manager_api::db::Database;
use task_manager_api::server::{AppState, run_server};
use tracing::info;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log, cli.verbose)?;

    let mut loader = match &cli.config {
        Some(path) => ConfigLoader::load_explicit(path.into(), ConfigPaths::discover())?,
        None => ConfigLoader::load()?,
    };
    if let Some(path) = loader.config_path() {
        info!("Using config {}", path.display());
    }

    let config = loader.config_mut();
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match cli.command {
        Some(Command::Serve) | None => serve(loader.into_config()).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    config.validate()?;
    config.ensure_db_dir()?;

    let db = Database::open(&config.server.db_path).with_context(|| {
        format!("Failed to open database {}", config.server.db_path.display())
    })?;
    info!("Database ready at {}", config.server.db_path.display());

    let listen = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = tokio::net::lookup_host(listen.as_str())
        .await
        .with_context(|| format!("Invalid listen address {}", listen))?
        .next()
        .with_context(|| format!("Listen address {} did not resolve", listen))?;

    run_server(AppState::new(db, &config), addr).await
}

/// Initialize logging based on the --log option. `RUST_LOG`, when set,
/// takes precedence over --verbose.
fn init_logging(target: &str, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match target {
        "0" | "off" => Ok(()),
        "1" | "stdout" => install(std::io::stdout, filter, true),
        "2" | "stderr" => install(std::io::stderr, filter, true),
        filename => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)
                .with_context(|| format!("Failed to open log file {}", filename))?;
            install(file, filter, false)
        }
    }
}

fn install<W>(writer: W, filter: EnvFilter, ansi: bool) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
