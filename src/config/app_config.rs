//! config/app_config.rs
//! Runtime configuration read from environment variables, with defaults
//! suitable for a local run against the embedded database.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/payments.db?mode=rwc";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },

    #[error("unsupported database url {0:?}, expected sqlite: or postgres:")]
    UnsupportedDatabase(String),
}

/// Which relational engine a connection string points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    /// Embedded SQLite, used for development and tests.
    Sqlite,
    /// Networked PostgreSQL, used in production.
    Postgres,
}

impl DatabaseBackend {
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme {
            "sqlite" => Ok(DatabaseBackend::Sqlite),
            "postgres" | "postgresql" => Ok(DatabaseBackend::Postgres),
            _ => Err(ConfigError::UnsupportedDatabase(url.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseBackend::Sqlite => "sqlite",
            DatabaseBackend::Postgres => "postgres",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub input_directory: PathBuf,
    pub report_success_dir: PathBuf,
    pub report_error_dir: PathBuf,
    pub server_host: String,
    pub server_port: u16,
    pub scan_interval: Duration,
    pub worker_count: usize,
    pub shutdown_grace: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: 5,
            input_directory: PathBuf::from("data/input"),
            report_success_dir: PathBuf::from("data/reports/success"),
            report_error_dir: PathBuf::from("data/reports/error"),
            server_host: "0.0.0.0".to_string(),
            server_port: 5022,
            scan_interval: Duration::from_secs(5),
            worker_count: 5,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl AppConfig {
    /// Reads the process environment. Call `dotenv().ok()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let database_url = lookup("DATABASE_URL").unwrap_or(defaults.database_url);
        DatabaseBackend::from_url(&database_url)?;

        let scan_secs: u64 = parse_or(&lookup, "SCAN_INTERVAL_SECS", 5)?;
        let worker_count: usize = parse_or(&lookup, "WORKER_COUNT", defaults.worker_count)?;
        let grace_secs: u64 = parse_or(&lookup, "SHUTDOWN_GRACE_SECS", 5)?;
        let db_max_connections: u32 =
            parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?;

        if scan_secs == 0 {
            return Err(ConfigError::Zero {
                key: "SCAN_INTERVAL_SECS",
            });
        }
        if worker_count == 0 {
            return Err(ConfigError::Zero { key: "WORKER_COUNT" });
        }
        if db_max_connections == 0 {
            return Err(ConfigError::Zero {
                key: "DB_MAX_CONNECTIONS",
            });
        }

        Ok(AppConfig {
            database_url,
            db_max_connections,
            input_directory: lookup("INPUT_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.input_directory),
            report_success_dir: lookup("REPORT_SUCCESS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_success_dir),
            report_error_dir: lookup("REPORT_ERROR_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_error_dir),
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_or(&lookup, "SERVER_PORT", defaults.server_port)?,
            scan_interval: Duration::from_secs(scan_secs),
            worker_count,
            shutdown_grace: Duration::from_secs(grace_secs),
        })
    }

    pub fn database_backend(&self) -> Result<DatabaseBackend, ConfigError> {
        DatabaseBackend::from_url(&self.database_url)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
    }
}
