//! Bootstrap and application initialization logic

use anyhow::Context;
use log::{info, warn};
use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{build_http_client, create_conn, run_migrations};
use crate::core::store::{MemoryStore, PgStore, Store};
use crate::drive::{FileStorage, UnconfiguredStorage};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CliOptions {
    /// Keep all data in process instead of PostgreSQL.
    pub memory: bool,
}

pub fn parse_cli_args(args: &[String]) -> CliOptions {
    CliOptions {
        memory: args.iter().skip(1).any(|a| a == "--memory"),
    }
}

/// `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
    info!("Starting Hive server {}...", env!("CARGO_PKG_VERSION"));
}

/// Initialize database pool and run migrations
pub async fn init_store(config: &AppConfig, options: CliOptions) -> anyhow::Result<Arc<dyn Store>> {
    if options.memory {
        warn!("Running with the in-memory store; nothing survives a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set unless --memory is given")?;
    let pool = create_conn(database_url).context("Database pool creation failed")?;

    info!("Running database migrations...");
    let migration_pool = pool.clone();
    tokio::task::spawn_blocking(move || run_migrations(&migration_pool))
        .await
        .context("Migration task panicked")?
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;
    info!("Database migrations completed successfully");

    Ok(Arc::new(PgStore::new(pool)))
}

pub async fn init_storage(config: &AppConfig) -> Arc<dyn FileStorage> {
    #[cfg(feature = "drive")]
    {
        if config.drive.is_configured() {
            info!("Presigning attachments against {}", config.drive.server);
            return Arc::new(crate::drive::S3Storage::from_config(&config.drive).await);
        }
    }

    if config.drive.is_configured() {
        warn!("DRIVE_SERVER is set but the drive feature is disabled");
    } else {
        warn!("File storage not configured; messages with attachments cannot be dispatched");
    }
    Arc::new(UnconfiguredStorage)
}

pub async fn create_app_state(config: AppConfig, options: CliOptions) -> anyhow::Result<Arc<AppState>> {
    let store = init_store(&config, options).await?;
    let storage = init_storage(&config).await;
    let http = build_http_client(config.stakwork.timeout_secs).context("Failed to build HTTP client")?;

    if config.stakwork.is_configured() {
        info!("Dispatching chat messages to Stakwork");
    } else {
        info!("Stakwork not configured; chat messages go to the mock responder");
    }

    Ok(Arc::new(AppState::new(config, store, storage, http)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_args() {
        let args = vec!["hive-server".to_string(), "--memory".to_string()];
        assert!(parse_cli_args(&args).memory);
        assert!(!parse_cli_args(&["hive-server".to_string()]).memory);
    }
}
