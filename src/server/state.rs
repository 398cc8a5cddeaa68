use axum::extract::FromRef;

use crate::catalog::Catalog;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

/// Read-only snapshot loaded once at startup.
pub type GuardedCatalog = Arc<Catalog>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub catalog: GuardedCatalog,
}

impl ServerState {
    pub fn new(config: ServerConfig, catalog: Catalog) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            catalog: Arc::new(catalog),
        }
    }
}

impl FromRef<ServerState> for GuardedCatalog {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
