//! Ballotbox - school election voting server
//!
//! Serves booth terminals and admin panels over TCP and keeps the tally
//! in SQLite.

use std::time::Duration;

use ballotbox_core::{password, validation, Database, Election};
use ballotbox_net::{ElectionHandle, Server};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod config;

use cli::{Cli, Command};
use config::AppConfig;

/// How long the election thread gets to wind down after shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(Command::HashPassword { password }) = &cli.command {
        init_logging("warn");
        std::process::exit(hash_password(password));
    }

    let config = load_configuration(&cli);
    let filter = config
        .as_ref()
        .map(|c| c.server.log_filter.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(&filter);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting Ballotbox");
    if let Err(e) = run(config).await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over the configured filter
fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

fn load_configuration(cli: &Cli) -> ballotbox_core::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    config.apply_env(|key| std::env::var(key).ok())?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(database) = &cli.database {
        config.server.database_path = Some(database.clone());
    }
    Ok(config)
}

async fn run(config: AppConfig) -> ballotbox_net::Result<()> {
    let db_path = config.database_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::open(&db_path)?;
    info!(path = %db_path.display(), schema_version = db.schema_version(), "Database ready");

    if config.election.admin_password_hash.is_none() {
        warn!("No admin_password_hash configured; falling back to the legacy admin password");
    }

    let election = Election::new(db, config.election.clone())?;
    let (handle, election_thread) = ElectionHandle::spawn(election)?;
    let server = Server::start(config.server_options(), handle).await?;

    info!(addr = %server.addr(), "Ballotbox is accepting connections");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    server.shutdown().await;
    drop(server);

    let drained = tokio::time::timeout(
        DRAIN_TIMEOUT,
        tokio::task::spawn_blocking(move || election_thread.join()),
    )
    .await;
    match drained {
        Ok(Ok(Ok(()))) => info!("Election stopped cleanly"),
        Ok(_) => error!("Election thread panicked"),
        Err(_) => warn!("Connections still open after shutdown; exiting anyway"),
    }

    Ok(())
}

/// `hash-password` subcommand; returns the process exit code
fn hash_password(plain: &str) -> i32 {
    let strength = validation::check_password_strength(plain);
    if !strength.valid {
        for problem in &strength.errors {
            warn!("Weak password: {}", problem);
        }
    }

    match password::hash_password(plain) {
        Ok(hash) => {
            println!("{}", hash);
            0
        }
        Err(e) => {
            error!("Failed to hash password: {}", e);
            1
        }
    }
}
