//! Database pool and schema migrations.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::config::DatabaseConfig;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("invalid database url: {0}")]
    Url(#[source] sqlx::Error),

    #[error("failed to open database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Open the pool with foreign keys enforced on every connection.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, DbError> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(DbError::Url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await
        .map_err(DbError::Connect)
}

/// Apply the embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Open the pool and bring the schema up to date.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, DbError> {
    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    tracing::info!(url = %config.url, "Database ready");
    Ok(pool)
}

/// Whether the database answers a trivial query.
pub async fn ping(pool: &DbPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}
