//! Shared realtime state
//!
//! [`RelayHub`] owns the connection table and the chat rooms. It is cloned into
//! the relay, the auto-responder and the REST state, so every component that
//! needs to push events holds an explicit handle instead of reaching for a global.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;
use super::events::ServerEvent;
use super::room::RoomManager;

/// Realtime state shared across all connections
#[derive(Clone)]
pub struct RelayHub {
    /// All active connections indexed by connection id
    connections: Arc<RwLock<HashMap<Uuid, Arc<Connection>>>>,

    /// Chat rooms used for broadcast fan-out
    rooms: Arc<RoomManager>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            rooms: Arc::new(RoomManager::new()),
        }
    }

    /// Add a connection
    pub async fn add_connection(&self, conn: Connection) -> Arc<Connection> {
        let conn = Arc::new(conn);
        let mut connections = self.connections.write().await;
        connections.insert(conn.id, Arc::clone(&conn));

        tracing::info!(
            connection_id = %conn.id,
            admin_user_id = ?conn.admin_user_id,
            total_connections = connections.len(),
            "WebSocket connection added"
        );

        conn
    }

    /// Remove a connection and drop it from every room it joined
    pub async fn remove_connection(&self, connection_id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(connection_id).is_some() {
            let left = self.rooms.remove_connection(connection_id).await;

            tracing::info!(
                connection_id = %connection_id,
                rooms_left = left,
                remaining_connections = connections.len(),
                "WebSocket connection removed"
            );
        }
    }

    /// Join a connection to a chat room (idempotent)
    pub async fn join_chat(&self, conn: &Arc<Connection>, chat_id: Uuid) -> bool {
        conn.track_join(chat_id).await;
        self.rooms.join(chat_id, Arc::clone(conn)).await
    }

    pub async fn leave_chat(&self, conn: &Connection, chat_id: Uuid) {
        conn.track_leave(&chat_id).await;
        self.rooms.leave(&chat_id, &conn.id).await;
    }

    /// Deliver an event to every connection joined to a chat
    pub async fn broadcast(&self, chat_id: Uuid, event: ServerEvent) -> usize {
        self.rooms.broadcast(&chat_id, event).await
    }

    pub async fn get_connection(&self, connection_id: &Uuid) -> Option<Arc<Connection>> {
        self.connections.read().await.get(connection_id).cloned()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn room_size(&self, chat_id: &Uuid) -> usize {
        self.rooms.get_room_size(chat_id).await
    }

    /// Get statistics about the realtime state
    pub async fn get_stats(&self) -> RelayStats {
        RelayStats {
            active_connections: self.connection_count().await,
            active_rooms: self.rooms.get_room_count().await,
        }
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about realtime connections
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStats {
    pub active_connections: usize,
    pub active_rooms: usize,
}
