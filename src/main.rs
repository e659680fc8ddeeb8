#![allow(dead_code)]
#![allow(unused_imports)]

mod channels;
mod cli;
mod config;
mod gateway;
mod links;
mod logging;
mod media;
mod server;
mod shorten;

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use channels::{telegram_receive_loop, TelegramChannel, TELEGRAM_DEFAULT_API_BASE_URL};
use cli::{Cli, Command};
use config::Config;
use gateway::Gateway;
use links::{LinkRegistry, RegistryConfig};
use shorten::Shortener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        // No subcommand or explicit `start` both launch the relay.
        None | Some(Command::Start) => run_relay().await,

        Some(Command::Status { port, host }) => cli::handle_status(&host, port).await,

        Some(Command::Version) => {
            cli::handle_version();
            Ok(())
        }
    }
}

/// Run the relay: registry, sweeper, Telegram receive loop, download server.
async fn run_relay() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;

    let config = Config::from_env()?;

    info!("linkdrop v{}", env!("CARGO_PKG_VERSION"));
    info!(path = %config.storage_dir.display(), "storage directory");
    info!(
        ttl_secs = config.ttl.as_secs(),
        sweep_interval_secs = config.sweep_interval.as_secs(),
        "link expiry"
    );

    let registry = Arc::new(LinkRegistry::new(RegistryConfig {
        storage_dir: config.storage_dir.clone(),
        ttl: config.ttl,
        sweep_interval: config.sweep_interval,
    })?);

    // Process-wide shutdown flag: flipping it stops the sweeper and the
    // receive loop; the HTTP server has its own channel inside its handle.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let sweeper = registry.clone().start_sweeper_task(shutdown_rx.clone());

    let channel = Arc::new(TelegramChannel::new(
        TELEGRAM_DEFAULT_API_BASE_URL.to_string(),
        config.bot_token.clone(),
    ));
    let bot_username = channel.get_me().await?;
    info!(bot = %bot_username, "authenticated to Telegram");

    let shortener = Shortener::new(config.shortener_url.clone());
    if shortener.is_enabled() {
        info!("URL shortener enabled");
    }

    let gateway = Arc::new(Gateway::new(
        channel,
        registry.clone(),
        shortener,
        config.clone(),
    ));

    tokio::spawn(telegram_receive_loop(
        TELEGRAM_DEFAULT_API_BASE_URL.to_string(),
        config.bot_token.clone(),
        gateway,
        shutdown_rx.clone(),
    ));

    let bind_address = server::resolve_bind_address(&config.host, config.port)?;
    let handle = server::run_server_with_config(server::ServerConfig {
        registry: registry.clone(),
        bind_address,
    })
    .await?;
    info!(base_url = %config.base_url, "serving download links");

    let reason = await_shutdown_trigger().await;
    info!("Shutdown signal received ({})", reason);

    let _ = shutdown_tx.send(true);
    handle.shutdown().await;
    let _ = sweeper.await;

    info!("Relay shut down");
    Ok(())
}

/// Initialize logging based on the LINKDROP_DEV environment variable.
fn init_logging_from_env() -> Result<(), Box<dyn std::error::Error>> {
    let log_config = if std::env::var("LINKDROP_DEV")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
    {
        logging::LogConfig::development()
    } else {
        logging::LogConfig::production()
    };
    logging::init_logging(log_config)?;
    Ok(())
}

/// Wait for either Ctrl+C or SIGTERM (Unix only) and return a label for logging.
#[cfg(unix)]
async fn await_shutdown_trigger() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => "ctrl-c",
                _ = sigterm.recv() => "SIGTERM",
            }
        }
        Err(e) => {
            warn!(
                "Failed to install SIGTERM handler: {}; falling back to Ctrl+C only",
                e
            );
            match tokio::signal::ctrl_c().await {
                Ok(()) => "ctrl-c",
                Err(e) => {
                    panic!("Failed to install Ctrl+C handler: {}", e);
                }
            }
        }
    }
}

/// On non-Unix platforms, only Ctrl+C is available.
#[cfg(not(unix))]
async fn await_shutdown_trigger() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "ctrl-c",
        Err(e) => {
            panic!("Failed to install Ctrl+C handler: {}", e);
        }
    }
}
