//! CLI subcommands and the plumbing they share.
//!
//! Every command reads the same environment as the server (see
//! `storelens_server::config`), so a `.env` file serves both.

pub mod cleanup;
pub mod migrate;
pub mod mirror;
pub mod report;
pub mod seed;

use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use storelens_server::config::{ConfigError, ServerConfig};
use storelens_server::db::{self, RepositoryError};
use storelens_server::docstore::{self, DocumentStoreError, MongoStore};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    DocumentStore(#[from] DocumentStoreError),

    #[error(transparent)]
    Core(#[from] storelens_core::Error),

    #[error("Document store not configured: set STORELENS_MONGODB_URI")]
    DocumentStoreNotConfigured,

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Load configuration from the environment.
pub(crate) fn load_config() -> Result<ServerConfig, CliError> {
    Ok(ServerConfig::from_env()?)
}

/// Connect to the relational store.
pub(crate) async fn connect_relational(config: &ServerConfig) -> Result<PgPool, CliError> {
    let pool = db::create_pool(&config.database_url).await?;
    info!("Connected to relational store");
    Ok(pool)
}

/// Connect to the document store, failing if it is not configured.
pub(crate) async fn connect_document(config: &ServerConfig) -> Result<MongoStore, CliError> {
    let mongo = config
        .mongo
        .as_ref()
        .ok_or(CliError::DocumentStoreNotConfigured)?;
    let store = docstore::connect(mongo).await?;
    info!(database = %mongo.database, "Connected to document store");
    Ok(store)
}
