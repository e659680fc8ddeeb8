//! Runtime configuration
//!
//! All settings come from `LINKDROP_*` environment variables; a `.env` file
//! in the working directory is honored as a development convenience. Missing
//! required variables or unparseable values abort startup before any network
//! service is spawned.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `LINKDROP_BOT_TOKEN` | required | Telegram bot token |
//! | `LINKDROP_BASE_URL` | required | public base URL for download links |
//! | `LINKDROP_HOST` | `0.0.0.0` | HTTP bind host |
//! | `LINKDROP_PORT` | `8000` | HTTP bind port |
//! | `LINKDROP_STORAGE_DIR` | `downloads` | backing-file directory |
//! | `LINKDROP_TTL_SECS` | `86400` | link time-to-live |
//! | `LINKDROP_SWEEP_INTERVAL_SECS` | `300` | sweeper tick interval |
//! | `LINKDROP_MAX_FILE_SIZE` | `52428800` | ingestion size cap in bytes |
//! | `LINKDROP_IDLE_TIMEOUT_SECS` | `30` | ingestion idle-read timeout |
//! | `LINKDROP_SHORTENER_URL` | unset | URL shortener endpoint |
//! | `LINKDROP_NOTIFY_CHAT_ID` | unset | chat receiving upload notifications |

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default HTTP bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default HTTP bind port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default directory for ingested files, relative to the working directory.
pub const DEFAULT_STORAGE_DIR: &str = "downloads";

/// Default link time-to-live: 24 hours.
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Default sweeper tick interval: 5 minutes.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Default maximum accepted file size: 50 MB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Default idle-read timeout for stalled transfers: 30 seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

/// Configuration errors. Any of these is fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

/// Runtime configuration for the whole service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token.
    pub bot_token: String,
    /// Public base URL used to build download links (absolute http/https).
    pub base_url: String,
    /// HTTP bind host.
    pub host: String,
    /// HTTP bind port.
    pub port: u16,
    /// Directory where ingested files are written.
    pub storage_dir: PathBuf,
    /// Link time-to-live.
    pub ttl: Duration,
    /// Sweeper tick interval.
    pub sweep_interval: Duration,
    /// Maximum accepted file size in bytes.
    pub max_file_size: u64,
    /// Idle-read timeout applied to each chunk read during ingestion.
    pub idle_timeout: Duration,
    /// Optional URL shortener endpoint; unset disables shortening.
    pub shortener_url: Option<Url>,
    /// Optional chat id that receives upload notifications.
    pub notify_chat_id: Option<i64>,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Reads a `.env` file first if one exists. Fails on the first missing
    /// required variable or unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bot_token = require("LINKDROP_BOT_TOKEN")?;
        let base_url = require("LINKDROP_BASE_URL")?;
        validate_base_url(&base_url)?;

        let host = optional("LINKDROP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_var("LINKDROP_PORT", DEFAULT_PORT)?;
        let storage_dir = PathBuf::from(
            optional("LINKDROP_STORAGE_DIR").unwrap_or_else(|| DEFAULT_STORAGE_DIR.to_string()),
        );

        let ttl_secs = parse_var("LINKDROP_TTL_SECS", DEFAULT_TTL_SECS)?;
        nonzero("LINKDROP_TTL_SECS", ttl_secs)?;
        let sweep_secs = parse_var("LINKDROP_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        nonzero("LINKDROP_SWEEP_INTERVAL_SECS", sweep_secs)?;
        let max_file_size = parse_var("LINKDROP_MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE)?;
        nonzero("LINKDROP_MAX_FILE_SIZE", max_file_size)?;
        let idle_secs = parse_var("LINKDROP_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS)?;
        nonzero("LINKDROP_IDLE_TIMEOUT_SECS", idle_secs)?;

        let shortener_url = match optional("LINKDROP_SHORTENER_URL") {
            Some(raw) => Some(Url::parse(&raw).map_err(|e| ConfigError::InvalidVar {
                var: "LINKDROP_SHORTENER_URL",
                reason: e.to_string(),
            })?),
            None => None,
        };

        let notify_chat_id = match optional("LINKDROP_NOTIFY_CHAT_ID") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::InvalidVar {
                var: "LINKDROP_NOTIFY_CHAT_ID",
                reason: format!("expected an integer chat id, got {raw:?}"),
            })?),
            None => None,
        };

        Ok(Self {
            bot_token,
            base_url,
            host,
            port,
            storage_dir,
            ttl: Duration::from_secs(ttl_secs),
            sweep_interval: Duration::from_secs(sweep_secs),
            max_file_size,
            idle_timeout: Duration::from_secs(idle_secs),
            shortener_url,
            notify_chat_id,
        })
    }

    /// The `host:port` string the HTTP listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the public download URL for a token.
    pub fn download_url(&self, token: &str) -> String {
        format!("{}/download/{}", self.base_url.trim_end_matches('/'), token)
    }
}

/// Read a required variable; empty/whitespace values count as missing.
fn require(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

/// Read an optional variable; empty values count as unset.
fn optional(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Parse a variable into `T`, falling back to `default` when unset.
///
/// An unset variable is fine; a set-but-unparseable one is a hard error so
/// typos never silently revert to defaults.
fn parse_var<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match optional(var) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn nonzero(var: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidVar {
            var,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

/// The base URL must be absolute http(s) so generated links are reachable.
fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidVar {
        var: "LINKDROP_BASE_URL",
        reason: e.to_string(),
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidVar {
            var: "LINKDROP_BASE_URL",
            reason: format!("unsupported scheme {:?}", url.scheme()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that modify global state (env vars).
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: &[&str] = &[
        "LINKDROP_BOT_TOKEN",
        "LINKDROP_BASE_URL",
        "LINKDROP_HOST",
        "LINKDROP_PORT",
        "LINKDROP_STORAGE_DIR",
        "LINKDROP_TTL_SECS",
        "LINKDROP_SWEEP_INTERVAL_SECS",
        "LINKDROP_MAX_FILE_SIZE",
        "LINKDROP_IDLE_TIMEOUT_SECS",
        "LINKDROP_SHORTENER_URL",
        "LINKDROP_NOTIFY_CHAT_ID",
    ];

    fn clear_env() {
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
    }

    fn set_required() {
        std::env::set_var("LINKDROP_BOT_TOKEN", "123456:test-token");
        std::env::set_var("LINKDROP_BASE_URL", "https://files.example.com");
    }

    #[test]
    fn test_defaults_applied() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();
        set_required();

        let config = Config::from_env().unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.storage_dir, PathBuf::from(DEFAULT_STORAGE_DIR));
        assert_eq!(config.ttl, Duration::from_secs(DEFAULT_TTL_SECS));
        assert_eq!(
            config.sweep_interval,
            Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)
        );
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(
            config.idle_timeout,
            Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)
        );
        assert!(config.shortener_url.is_none());
        assert!(config.notify_chat_id.is_none());
        clear_env();
    }

    #[test]
    fn test_missing_bot_token() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("LINKDROP_BASE_URL", "https://files.example.com");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("LINKDROP_BOT_TOKEN")));
        clear_env();
    }

    #[test]
    fn test_missing_base_url() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("LINKDROP_BOT_TOKEN", "123456:test-token");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("LINKDROP_BASE_URL")));
        clear_env();
    }

    #[test]
    fn test_invalid_port_is_fatal() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();
        set_required();
        std::env::set_var("LINKDROP_PORT", "not-a-port");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidVar {
                var: "LINKDROP_PORT",
                ..
            }
        ));
        clear_env();
    }

    #[test]
    fn test_base_url_must_be_http() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("LINKDROP_BOT_TOKEN", "123456:test-token");
        std::env::set_var("LINKDROP_BASE_URL", "ftp://files.example.com");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidVar {
                var: "LINKDROP_BASE_URL",
                ..
            }
        ));
        clear_env();
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();
        set_required();
        std::env::set_var("LINKDROP_TTL_SECS", "0");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidVar {
                var: "LINKDROP_TTL_SECS",
                ..
            }
        ));
        clear_env();
    }

    #[test]
    fn test_optional_vars_parsed() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();
        set_required();
        std::env::set_var("LINKDROP_SHORTENER_URL", "https://short.example.com/api");
        std::env::set_var("LINKDROP_NOTIFY_CHAT_ID", "-1001234567890");
        std::env::set_var("LINKDROP_TTL_SECS", "3600");

        let config = Config::from_env().unwrap();
        assert_eq!(
            config.shortener_url.as_ref().map(|u| u.as_str()),
            Some("https://short.example.com/api")
        );
        assert_eq!(config.notify_chat_id, Some(-1_001_234_567_890));
        assert_eq!(config.ttl, Duration::from_secs(3600));
        clear_env();
    }

    #[test]
    fn test_invalid_notify_chat_id() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();
        set_required();
        std::env::set_var("LINKDROP_NOTIFY_CHAT_ID", "everyone");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidVar {
                var: "LINKDROP_NOTIFY_CHAT_ID",
                ..
            }
        ));
        clear_env();
    }

    #[test]
    fn test_bind_addr_and_download_url() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();
        set_required();
        std::env::set_var("LINKDROP_HOST", "127.0.0.1");
        std::env::set_var("LINKDROP_PORT", "9000");
        std::env::set_var("LINKDROP_BASE_URL", "https://files.example.com/");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        // Trailing slash on the base URL must not produce a double slash.
        assert_eq!(
            config.download_url("abc123"),
            "https://files.example.com/download/abc123"
        );
        clear_env();
    }
}
