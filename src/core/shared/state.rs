use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::store::Store;
use crate::drive::FileStorage;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn Store>,
    pub storage: Arc<dyn FileStorage>,
    /// Shared outbound client, timeout set from `STAKWORK_TIMEOUT_SECS`.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, storage: Arc<dyn FileStorage>, http: reqwest::Client) -> Self {
        Self {
            config,
            store,
            storage,
            http,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
