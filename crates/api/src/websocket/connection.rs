//! WebSocket connection management
//!
//! Represents an active WebSocket connection with room membership tracking.

use std::collections::HashSet;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::events::ServerEvent;

/// Represents an active WebSocket connection
#[derive(Debug)]
pub struct Connection {
    /// Unique ID for this connection
    pub id: Uuid,

    /// Staff user bound to this connection through the admin session cookie
    pub admin_user_id: Option<Uuid>,

    /// Channel to send events to this connection
    pub sender: mpsc::UnboundedSender<ServerEvent>,

    /// Chat rooms this connection has joined
    rooms: RwLock<HashSet<Uuid>>,
}

impl Connection {
    /// Create a new connection
    pub fn new(admin_user_id: Option<Uuid>, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            admin_user_id,
            sender,
            rooms: RwLock::new(HashSet::new()),
        }
    }

    /// Send an event to this connection
    ///
    /// Returns Ok(()) if sent successfully, Err if connection is closed
    #[allow(clippy::result_large_err)] // Error type is from tokio mpsc, containing the failed event
    pub fn send(&self, event: ServerEvent) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event)
    }

    /// Record membership of a chat room; returns false if already a member
    pub async fn track_join(&self, chat_id: Uuid) -> bool {
        self.rooms.write().await.insert(chat_id)
    }

    /// Forget membership of a chat room
    pub async fn track_leave(&self, chat_id: &Uuid) -> bool {
        self.rooms.write().await.remove(chat_id)
    }

    pub async fn is_member(&self, chat_id: &Uuid) -> bool {
        self.rooms.read().await.contains(chat_id)
    }

    pub async fn rooms(&self) -> HashSet<Uuid> {
        self.rooms.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_room_tracking() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = Connection::new(None, tx);
        let chat_id = Uuid::new_v4();

        assert!(!conn.is_member(&chat_id).await);

        assert!(conn.track_join(chat_id).await);
        assert!(!conn.track_join(chat_id).await);
        assert!(conn.is_member(&chat_id).await);

        assert!(conn.track_leave(&chat_id).await);
        assert!(!conn.is_member(&chat_id).await);
    }

    #[tokio::test]
    async fn test_send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection::new(Some(Uuid::new_v4()), tx);
        assert!(conn.send(ServerEvent::Pong).is_ok());
        drop(rx);
        assert!(conn.send(ServerEvent::Pong).is_err());
    }
}
