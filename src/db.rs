//! db.rs
//! Connection pool over the `Any` driver so the same services run against
//! embedded SQLite (dev/test) or PostgreSQL (production).

use std::path::Path;

use anyhow::{Context, Result};
use sqlx::any::AnyPoolOptions;
use sqlx::{Any, Pool};

use crate::config::app_config::{AppConfig, DatabaseBackend};

#[derive(Clone, Debug)]
pub struct Database {
    pool: Pool<Any>,
    backend: DatabaseBackend,
}

impl Database {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let backend = config.database_backend()?;
        Self::open(&config.database_url, backend, config.db_max_connections).await
    }

    async fn open(url: &str, backend: DatabaseBackend, max_connections: u32) -> Result<Self> {
        sqlx::any::install_default_drivers();

        if backend == DatabaseBackend::Sqlite {
            ensure_sqlite_parent_dir(url)?;
        }

        // Every connection to `sqlite::memory:` opens its own database.
        let in_memory = url.contains(":memory:");
        let mut options = AnyPoolOptions::new();
        options = if in_memory {
            options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options.max_connections(max_connections)
        };

        log::info!("Connecting to {} database", backend.as_str());
        let pool = options
            .connect(url)
            .await
            .with_context(|| format!("Could not connect to {} database", backend.as_str()))?;

        Ok(Database { pool, backend })
    }

    /// In-memory SQLite with migrations applied, for tests.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let db = Self::open("sqlite::memory:", DatabaseBackend::Sqlite, 1).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        match self.backend {
            DatabaseBackend::Sqlite => sqlx::migrate!("./migrations/sqlite")
                .run(&self.pool)
                .await
                .context("Failed to run sqlite migrations")?,
            DatabaseBackend::Postgres => sqlx::migrate!("./migrations/postgres")
                .run(&self.pool)
                .await
                .context("Failed to run postgres migrations")?,
        }
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Any> {
        &self.pool
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }
}

fn ensure_sqlite_parent_dir(url: &str) -> Result<()> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create database directory {:?}", parent))?;
    }
    Ok(())
}
