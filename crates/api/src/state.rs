//! Application state shared by every handler

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::auth::SessionManager;
use crate::config::Config;
use crate::store::ChatStore;
use crate::websocket::{AutoResponder, MessageRelay, RelayHub};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    /// Session store used by the relay and the visitor routes
    pub store: Arc<dyn ChatStore>,
    /// Realtime rooms, used by REST handlers to notify connected clients
    pub hub: RelayHub,
    pub relay: Arc<MessageRelay>,
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool, store: Arc<dyn ChatStore>) -> Self {
        let hub = RelayHub::new();
        let auto_responder = AutoResponder::new(
            Arc::clone(&store),
            hub.clone(),
            Duration::from_millis(config.auto_response_delay_ms),
        );
        let relay = MessageRelay::new(
            Arc::clone(&store),
            hub.clone(),
            auto_responder,
            config.relay_require_admin_session,
        );
        let sessions = SessionManager::new(pool.clone(), config.session_ttl_hours);

        Self {
            pool,
            config: Arc::new(config),
            store,
            hub,
            relay: Arc::new(relay),
            sessions,
        }
    }

    pub fn auto_responder(&self) -> &AutoResponder {
        self.relay.auto_responder()
    }
}
