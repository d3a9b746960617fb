//! Server configuration, read from the environment once at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_CONTENT_TIMEOUT_MS: u64 = 8000;
const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 1800;

/// Runtime configuration for the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `PostgreSQL` connection string.
    pub database_url: String,
    /// Listen host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Connection pool size.
    pub database_max_connections: u32,
    /// YAML scene catalog replacing the built-in one.
    pub scene_catalog_path: Option<PathBuf>,
    /// Base URL of the content generator. Unset means offline.
    pub content_generator_url: Option<String>,
    /// Sent to the content generator as the `api-key` header.
    pub content_generator_api_key: Option<String>,
    /// Bound on each content generator call.
    pub content_timeout: Duration,
    /// OTLP collector endpoint. Unset disables span export.
    pub otlp_endpoint: Option<String>,
    /// How long an unused play-through stays in memory.
    pub session_idle_timeout: Duration,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a value
    /// does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let database_url = get("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".to_owned())
        })?;

        Ok(Self {
            database_url,
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: parse_or(get("PORT"), "PORT", DEFAULT_PORT)?,
            database_max_connections: parse_or(
                get("DATABASE_MAX_CONNECTIONS"),
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            scene_catalog_path: get("SCENE_CATALOG_PATH").map(PathBuf::from),
            content_generator_url: get("CONTENT_GENERATOR_URL"),
            content_generator_api_key: get("CONTENT_GENERATOR_API_KEY"),
            content_timeout: Duration::from_millis(parse_or(
                get("CONTENT_TIMEOUT_MS"),
                "CONTENT_TIMEOUT_MS",
                DEFAULT_CONTENT_TIMEOUT_MS,
            )?),
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
            session_idle_timeout: Duration::from_secs(parse_or(
                get("SESSION_IDLE_TIMEOUT_SECS"),
                "SESSION_IDLE_TIMEOUT_SECS",
                DEFAULT_SESSION_IDLE_TIMEOUT_SECS,
            )?),
        })
    }

    /// The socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a valid address.
    pub fn listen_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|e| AppError::Config(format!("{key} must be a valid number: {e}")))
    })
}
