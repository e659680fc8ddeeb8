//! Testable server startup logic.
//!
//! Provides [`ServerConfig`] and [`ServerHandle`] to allow integration tests
//! to spin up a real relay server on an ephemeral port, exercise its HTTP
//! endpoints, and shut it down cleanly.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::links::LinkRegistry;
use crate::server::http;

/// Errors from bind address resolution.
#[derive(Error, Debug)]
pub enum BindError {
    #[error("failed to resolve host {host}: {message}")]
    ResolutionFailed { host: String, message: String },
}

/// Everything needed to start the relay's HTTP server.
pub struct ServerConfig {
    pub registry: Arc<LinkRegistry>,
    pub bind_address: SocketAddr,
}

impl ServerConfig {
    /// Minimal config suitable for integration tests.
    ///
    /// Binds to `127.0.0.1:0` (OS-assigned port).
    pub fn for_testing(registry: Arc<LinkRegistry>) -> Self {
        ServerConfig {
            registry,
            bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        }
    }
}

/// Handle to a running server.  Returned by [`run_server_with_config`].
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    server_task: JoinHandle<Result<(), std::io::Error>>,
}

impl ServerHandle {
    /// The port the server actually bound to (useful when binding to port 0).
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// The full local address (ip + port).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `http://ip:port` base URL for the running server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Trigger graceful shutdown and wait for the serve task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);

        match tokio::time::timeout(Duration::from_secs(5), self.server_task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => error!("Server task returned error: {}", e),
            Ok(Err(e)) => error!("Server task panicked: {}", e),
            Err(_) => warn!("Server task did not finish within 5s timeout"),
        }
    }
}

/// Resolve a configured host string to a bind address.
///
/// Accepts bare IP addresses and hostnames; hostnames resolving to several
/// addresses prefer IPv4.
pub fn resolve_bind_address(host: &str, port: u16) -> Result<SocketAddr, BindError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    let candidates = format!("{host}:{port}")
        .to_socket_addrs()
        .map_err(|e| BindError::ResolutionFailed {
            host: host.to_string(),
            message: e.to_string(),
        })?;

    let mut ipv6 = None;
    for addr in candidates {
        match addr.ip() {
            IpAddr::V4(_) => return Ok(addr),
            IpAddr::V6(_) => {
                if ipv6.is_none() {
                    ipv6 = Some(addr);
                }
            }
        }
    }

    ipv6.ok_or_else(|| BindError::ResolutionFailed {
        host: host.to_string(),
        message: "no addresses found".to_string(),
    })
}

/// Start the HTTP server from a fully-assembled [`ServerConfig`].
///
/// Returns a [`ServerHandle`] that exposes the actual bound address and
/// provides a [`ServerHandle::shutdown`] method for clean teardown.
pub async fn run_server_with_config(
    config: ServerConfig,
) -> Result<ServerHandle, Box<dyn std::error::Error>> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app = http::create_router(config.registry);

    // Bind TCP listener (supports port 0 for ephemeral port assignment)
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    let local_addr = listener.local_addr()?;

    info!(address = %local_addr, "HTTP server listening");

    // Spawn axum::serve as a background tokio task with graceful shutdown
    let mut shutdown_watch = shutdown_rx.clone();
    let server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                // Wait until the shutdown channel is set to true
                loop {
                    if *shutdown_watch.borrow() {
                        break;
                    }
                    if shutdown_watch.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await
    });

    Ok(ServerHandle {
        local_addr,
        shutdown_tx,
        server_task,
    })
}
