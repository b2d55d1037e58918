//! Chat room management for pub/sub
//!
//! A room is the set of connections currently joined to one chat.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;
use super::events::ServerEvent;

/// Manages chat "rooms" for broadcasting events
pub struct RoomManager {
    /// Map of chat_id -> list of connections
    rooms: RwLock<HashMap<Uuid, Vec<Arc<Connection>>>>,
}

impl RoomManager {
    /// Create a new room manager
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection to a chat room
    ///
    /// Joining is idempotent; returns false when the connection was already a member.
    pub async fn join(&self, chat_id: Uuid, conn: Arc<Connection>) -> bool {
        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(chat_id).or_default();

        if members.iter().any(|c| c.id == conn.id) {
            return false;
        }
        members.push(Arc::clone(&conn));

        tracing::debug!(
            chat_id = %chat_id,
            connection_id = %conn.id,
            room_size = members.len(),
            "Connection joined chat room"
        );
        true
    }

    /// Remove a connection from a chat room
    pub async fn leave(&self, chat_id: &Uuid, connection_id: &Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(conns) = rooms.get_mut(chat_id) {
            conns.retain(|c| c.id != *connection_id);

            // Clean up empty rooms
            if conns.is_empty() {
                rooms.remove(chat_id);
                tracing::debug!(chat_id = %chat_id, "Removed empty chat room");
            } else {
                tracing::debug!(
                    chat_id = %chat_id,
                    connection_id = %connection_id,
                    room_size = conns.len(),
                    "Connection left chat room"
                );
            }
        }
    }

    /// Broadcast an event to all connections in a chat room
    ///
    /// Silently skips closed connections; they are cleaned up on disconnect.
    /// Returns the number of connections the event was handed to.
    pub async fn broadcast(&self, chat_id: &Uuid, event: ServerEvent) -> usize {
        let rooms = self.rooms.read().await;
        let Some(conns) = rooms.get(chat_id) else {
            tracing::debug!(chat_id = %chat_id, "No connections joined to chat room");
            return 0;
        };

        let mut delivered = 0;
        let mut failed = 0;
        for conn in conns {
            match conn.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    failed += 1;
                    tracing::warn!(
                        connection_id = %conn.id,
                        "Failed to send event to connection (likely closed)"
                    );
                }
            }
        }

        tracing::debug!(
            chat_id = %chat_id,
            recipients = delivered,
            failed,
            "Broadcast event to chat room"
        );
        delivered
    }

    /// Remove a connection from all rooms, returning how many it left
    pub async fn remove_connection(&self, connection_id: &Uuid) -> usize {
        let mut rooms = self.rooms.write().await;
        let mut removed_from = 0;

        for conns in rooms.values_mut() {
            let before_len = conns.len();
            conns.retain(|c| c.id != *connection_id);
            if conns.len() < before_len {
                removed_from += 1;
            }
        }

        // Clean up empty rooms
        rooms.retain(|_, conns| !conns.is_empty());

        if removed_from > 0 {
            tracing::debug!(
                connection_id = %connection_id,
                room_count = removed_from,
                "Removed connection from rooms"
            );
        }
        removed_from
    }

    /// Number of connections joined to a chat
    pub async fn get_room_size(&self, chat_id: &Uuid) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(chat_id).map(|v| v.len()).unwrap_or(0)
    }

    /// Total number of non-empty rooms
    pub async fn get_room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn connection() -> (Arc<Connection>, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Connection::new(None, tx)), rx)
    }

    #[tokio::test]
    async fn test_room_join_and_leave() {
        let room_manager = RoomManager::new();
        let chat_id = Uuid::new_v4();
        let (conn, _rx) = connection();

        assert_eq!(room_manager.get_room_size(&chat_id).await, 0);

        assert!(room_manager.join(chat_id, Arc::clone(&conn)).await);
        assert_eq!(room_manager.get_room_size(&chat_id).await, 1);

        room_manager.leave(&chat_id, &conn.id).await;
        assert_eq!(room_manager.get_room_size(&chat_id).await, 0);
        assert_eq!(room_manager.get_room_count().await, 0);
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let room_manager = RoomManager::new();
        let chat_id = Uuid::new_v4();
        let (conn, mut rx) = connection();

        assert!(room_manager.join(chat_id, Arc::clone(&conn)).await);
        assert!(!room_manager.join(chat_id, Arc::clone(&conn)).await);
        assert_eq!(room_manager.get_room_size(&chat_id).await, 1);

        assert_eq!(room_manager.broadcast(&chat_id, ServerEvent::Pong).await, 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_to_room() {
        let room_manager = RoomManager::new();
        let chat_id = Uuid::new_v4();
        let other_chat = Uuid::new_v4();

        let (conn1, mut rx1) = connection();
        let (conn2, mut rx2) = connection();
        let (outsider, mut rx3) = connection();

        room_manager.join(chat_id, conn1).await;
        room_manager.join(chat_id, conn2).await;
        room_manager.join(other_chat, outsider).await;

        assert_eq!(room_manager.broadcast(&chat_id, ServerEvent::Pong).await, 2);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_skips_closed_connections() {
        let room_manager = RoomManager::new();
        let chat_id = Uuid::new_v4();
        let (open, mut rx_open) = connection();
        let (closed, rx_closed) = connection();
        drop(rx_closed);

        room_manager.join(chat_id, open).await;
        room_manager.join(chat_id, closed).await;

        assert_eq!(room_manager.broadcast(&chat_id, ServerEvent::Pong).await, 1);
        assert!(rx_open.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_remove_connection_from_all_rooms() {
        let room_manager = RoomManager::new();
        let chat1 = Uuid::new_v4();
        let chat2 = Uuid::new_v4();
        let (conn, _rx) = connection();

        room_manager.join(chat1, Arc::clone(&conn)).await;
        room_manager.join(chat2, Arc::clone(&conn)).await;
        assert_eq!(room_manager.get_room_count().await, 2);

        assert_eq!(room_manager.remove_connection(&conn.id).await, 2);
        assert_eq!(room_manager.get_room_count().await, 0);
    }
}
