//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::connection::ConnectionRegistry;
use crate::game::MatchRegistry;
use crate::matchmaking::MatchmakingService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub connections: Arc<ConnectionRegistry>,
    pub matchmaking: Arc<MatchmakingService>,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Initialize connection registry
        let connections = Arc::new(ConnectionRegistry::new());

        // Initialize match registry
        let match_registry = Arc::new(MatchRegistry::new());

        // Initialize matchmaking service (Arc for sharing across cloned AppState)
        let matchmaking = Arc::new(MatchmakingService::new(
            &config,
            match_registry.clone(),
            connections.clone(),
        ));

        Self {
            config,
            connections,
            matchmaking,
            match_registry,
        }
    }
}
