use axum::extract::FromRef;

use crate::analysis::Analyzer;
use crate::catalog_store::CatalogStore;
use crate::session_store::SessionStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedCatalogStore = Arc<dyn CatalogStore>;
pub type GuardedSessionStore = Arc<dyn SessionStore>;
pub type GuardedAnalyzer = Arc<Analyzer>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub catalog_store: GuardedCatalogStore,
    pub session_store: GuardedSessionStore,
    pub analyzer: GuardedAnalyzer,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedCatalogStore {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog_store.clone()
    }
}

impl FromRef<ServerState> for GuardedSessionStore {
    fn from_ref(input: &ServerState) -> Self {
        input.session_store.clone()
    }
}

impl FromRef<ServerState> for GuardedAnalyzer {
    fn from_ref(input: &ServerState) -> Self {
        input.analyzer.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
