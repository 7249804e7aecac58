use std::time::Duration;

use anyhow::Context;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

pub mod row_parsers;

/// Backend picked at startup. The data path never branches on this; it only
/// affects which driver the pool speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    Sqlite,
    Postgres,
}

/// Environment-driven database configuration.
///
/// Held as plain fields so the selection rule stays a pure function; only
/// `from_env` touches the process environment.
#[derive(Debug, Clone, Default)]
pub struct DbSettings {
    pub database_url: Option<String>,
    pub database_host: Option<String>,
    pub database_port: Option<String>,
    pub database_user: Option<String>,
    pub database_password: Option<String>,
    pub database_name: Option<String>,
    pub app_env: Option<String>,
}

impl DbSettings {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            database_url: var("DATABASE_URL"),
            database_host: var("DATABASE_HOST"),
            database_port: var("DATABASE_PORT"),
            database_user: var("DATABASE_USER"),
            database_password: var("DATABASE_PASSWORD"),
            database_name: var("DATABASE_NAME"),
            app_env: var("APP_ENV"),
        }
    }

    /// Pick the backend and connection URL.
    ///
    /// An explicit `DATABASE_URL` wins and carries its own scheme. A
    /// `DATABASE_HOST` or `APP_ENV=production` means PostgreSQL; everything
    /// else falls back to a local SQLite file.
    pub fn select(&self) -> (DatabaseKind, String) {
        if let Some(url) = &self.database_url {
            let kind = if url.starts_with("postgres") {
                DatabaseKind::Postgres
            } else {
                DatabaseKind::Sqlite
            };
            return (kind, url.clone());
        }

        let production = self.app_env.as_deref() == Some("production");
        if self.database_host.is_some() || production {
            let host = self.database_host.as_deref().unwrap_or("localhost");
            let port = self.database_port.as_deref().unwrap_or("5432");
            let user = self.database_user.as_deref().unwrap_or("postgres");
            let password = self.database_password.as_deref().unwrap_or("");
            let name = self.database_name.as_deref().unwrap_or("rolodex");
            return (
                DatabaseKind::Postgres,
                format!("postgres://{}:{}@{}:{}/{}", user, password, host, port, name),
            );
        }

        (
            DatabaseKind::Sqlite,
            "sqlite://rolodex.db?mode=rwc".to_string(),
        )
    }
}

/// Connection URL for a SQLite file, creating it if missing.
pub fn sqlite_url(path: &std::path::Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

/// Connect to `url` and run embedded migrations.
pub async fn connect(url: &str) -> anyhow::Result<AnyPool> {
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    Ok(pool)
}

pub async fn init() -> anyhow::Result<AnyPool> {
    let settings = DbSettings::from_env();
    let (kind, url) = settings.select();
    tracing::info!(backend = ?kind, "selected database backend");
    connect(&url).await
}
