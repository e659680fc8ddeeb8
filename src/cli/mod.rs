//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `start` (default) -- run the relay: Telegram receive loop plus download server
//! - `status` -- query a running instance for health info
//! - `version` -- print version info

use clap::{Parser, Subcommand};

/// Linkdrop file relay: receive files over Telegram, serve expiring download links.
#[derive(Parser, Debug)]
#[command(name = "linkdrop", version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Receive files from a Telegram chat and serve time-limited download links")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the relay (default when no subcommand is given)
    Start,
    /// Query a running instance for health information
    Status {
        /// Port the instance is listening on (defaults to $LINKDROP_PORT, then 8000)
        #[arg(short, long)]
        port: Option<u16>,
        /// Host the instance is listening on
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Print version information
    Version,
}

// ============================================================================
// Status
// ============================================================================

/// Queries the `/health` endpoint of a running instance and prints a summary.
pub async fn handle_status(host: &str, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let port = resolve_port(port);
    let url = format!("http://{host}:{port}/health");

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    let response = match client.get(&url).send().await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("✗ Could not reach linkdrop at {host}:{port}");
            eprintln!("  {e}");
            std::process::exit(1);
        }
    };

    if !response.status().is_success() {
        eprintln!("✗ Instance at {host}:{port} returned HTTP {}", response.status());
        std::process::exit(1);
    }

    let health: serde_json::Value = response.json().await?;

    println!("✓ linkdrop is running");
    println!("  Address:      {host}:{port}");
    if let Some(status) = health.get("status").and_then(|v| v.as_str()) {
        println!("  Status:       {status}");
    }
    if let Some(uptime) = health.get("uptimeSeconds").and_then(|v| v.as_i64()) {
        println!("  Uptime:       {}", format_duration(uptime));
    }
    if let Some(count) = health.get("recordCount").and_then(|v| v.as_u64()) {
        println!("  Active links: {count}");
    }

    Ok(())
}

/// Picks the status port: explicit flag, then $LINKDROP_PORT, then the default.
fn resolve_port(explicit: Option<u16>) -> u16 {
    if let Some(p) = explicit {
        return p;
    }
    if let Ok(raw) = std::env::var("LINKDROP_PORT") {
        if let Ok(p) = raw.parse() {
            return p;
        }
    }
    crate::config::DEFAULT_PORT
}

/// Formats a second count as a short human duration, e.g. "2d 4h" or "35m 10s".
fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m {}s", minutes, seconds % 60);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h {}m", hours, minutes % 60);
    }
    format!("{}d {}h", hours / 24, hours % 24)
}

// ============================================================================
// Version
// ============================================================================

/// Prints the crate version and target platform.
pub fn handle_version() {
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("  platform: {}/{}", std::env::consts::OS, std::env::consts::ARCH);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_args_defaults_to_none() {
        let cli = Cli::try_parse_from(["linkdrop"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_start() {
        let cli = Cli::try_parse_from(["linkdrop", "start"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Start)));
    }

    #[test]
    fn test_parse_version() {
        let cli = Cli::try_parse_from(["linkdrop", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
    }

    #[test]
    fn test_parse_status_with_port() {
        let cli = Cli::try_parse_from(["linkdrop", "status", "--port", "9000"]).unwrap();
        match cli.command {
            Some(Command::Status { port, host }) => {
                assert_eq!(port, Some(9000));
                assert_eq!(host, "127.0.0.1");
            }
            other => panic!("expected status command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_status_with_host() {
        let cli = Cli::try_parse_from(["linkdrop", "status", "--host", "10.0.0.5"]).unwrap();
        match cli.command {
            Some(Command::Status { port, host }) => {
                assert_eq!(port, None);
                assert_eq!(host, "10.0.0.5");
            }
            other => panic!("expected status command, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_port_explicit_wins() {
        assert_eq!(resolve_port(Some(4321)), 4321);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3_700), "1h 1m");
        assert_eq!(format_duration(90_000), "1d 1h");
    }
}
