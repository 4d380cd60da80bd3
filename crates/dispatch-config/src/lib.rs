//! Process configuration, read from the environment at startup.
//!
//! Every knob has a `DISPATCH_`-prefixed variable; only the database
//! URL is required (`memory://` selects the ephemeral in-memory store).
//! Log filtering rides the standard `RUST_LOG`. A `.env` file is
//! honoured in development via [`Config::from_env`]'s dotenv bootstrap.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

const ENV_DATABASE_URL: &str = "DISPATCH_DATABASE_URL";
const ENV_GRPC_ADDR: &str = "DISPATCH_GRPC_ADDR";
const ENV_HTTP_ADDR: &str = "DISPATCH_HTTP_ADDR";
const ENV_METRICS_ADDR: &str = "DISPATCH_METRICS_ADDR";
const ENV_SHUTDOWN_TIMEOUT_SECS: &str = "DISPATCH_SHUTDOWN_TIMEOUT_SECS";

const DEFAULT_GRPC_ADDR: &str = "0.0.0.0:50051";
const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9090";
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub grpc_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub metrics_addr: SocketAddr,
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Load from the process environment, after attempting a `.env`
    /// bootstrap. A missing `.env` file is not an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env_only()
    }

    /// Load from the process environment without touching `.env`.
    pub fn from_env_only() -> Result<Self, ConfigError> {
        Ok(Config {
            database_url: require(ENV_DATABASE_URL)?,
            grpc_addr: addr(ENV_GRPC_ADDR, DEFAULT_GRPC_ADDR)?,
            http_addr: addr(ENV_HTTP_ADDR, DEFAULT_HTTP_ADDR)?,
            metrics_addr: addr(ENV_METRICS_ADDR, DEFAULT_METRICS_ADDR)?,
            shutdown_timeout: Duration::from_secs(seconds(
                ENV_SHUTDOWN_TIMEOUT_SECS,
                DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            )?),
        })
    }
}

fn require(key: &'static str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn addr(key: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse().map_err(|e| ConfigError::Invalid {
        key,
        message: format!("{e} (got '{raw}')"),
    })
}

fn seconds(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
            key,
            message: format!("{e} (got '{raw}')"),
        }),
    }
}
