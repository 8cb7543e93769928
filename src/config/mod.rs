//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::util::time::TICK_INTERVAL_MS;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Human-readable or JSON log lines
    pub log_format: LogFormat,

    /// Allowed client origins for CORS (empty = permissive)
    pub client_origins: Vec<String>,
    /// Directory of client files served at `/`
    pub static_dir: Option<PathBuf>,

    /// Period of the match tick loop
    pub tick_interval: Duration,
    /// Maximum number of connections waiting in the matchmaking queue
    pub max_queue_len: usize,
    /// Maximum number of live matches
    pub max_matches: usize,
    /// Server-side fire cooldown, zero disables it
    pub fire_cooldown: Duration,
    /// Inbound websocket messages allowed per second per connection
    pub input_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: parse_or(&lookup, "LOG_FORMAT", LogFormat::Text)?,

            client_origins,
            static_dir: lookup("STATIC_DIR").map(PathBuf::from),

            tick_interval: Duration::from_millis(parse_nonzero_or(
                &lookup,
                "TICK_INTERVAL_MS",
                TICK_INTERVAL_MS,
            )?),
            max_queue_len: parse_nonzero_or(&lookup, "MAX_QUEUE_LEN", 1024)?,
            max_matches: parse_nonzero_or(&lookup, "MAX_MATCHES", 512)?,
            fire_cooldown: Duration::from_millis(parse_or(&lookup, "FIRE_COOLDOWN_MS", 0)?),
            input_rate_limit: parse_nonzero_or(&lookup, "INPUT_RATE_LIMIT", 240)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            client_origins: Vec::new(),
            static_dir: None,
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            max_queue_len: 1024,
            max_matches: 512,
            fire_cooldown: Duration::ZERO,
            input_rate_limit: 240,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Output format of the tracing subscriber
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// Like `parse_or`, but zero is rejected
fn parse_nonzero_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default,
{
    let value = parse_or(lookup, key, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid(key));
    }
    Ok(value)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
