//! WebSocket event types and serialization
//!
//! Frames are JSON objects tagged by `type` (kebab-case) with camelCase fields,
//! e.g. `{"type":"join-chat","chatId":"..."}`.

use livechat_shared::{Message, MessageSender, User, UserRole};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Client-to-Server Events
// =============================================================================

/// Events sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Join the broadcast room of a chat
    JoinChat { chat_id: String },

    /// Leave the broadcast room of a chat
    LeaveChat { chat_id: String },

    /// Post a message into a chat
    SendMessage(SendMessagePayload),

    /// Heartbeat ping to keep connection alive
    Ping,
}

/// Body of a `send-message` event
///
/// Every field is optional on the wire so that missing values are reported
/// through the relay's own validation signals rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub is_bot: Option<bool>,
    #[serde(default)]
    pub sender_role: Option<String>,
    #[serde(default, alias = "authorUserId")]
    pub user_id: Option<String>,
}

impl SendMessagePayload {
    /// Whether the sender claims to act for the support side
    pub fn acts_as_staff(&self) -> bool {
        self.is_admin.unwrap_or(false)
            || self.is_bot.unwrap_or(false)
            || self
                .sender_role
                .as_deref()
                .and_then(UserRole::parse)
                .map(|role| role.is_staff())
                .unwrap_or(false)
    }
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Events sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Connection acknowledged
    Connected { connection_id: Uuid },

    /// New message in a chat (room broadcast)
    ReceiveMessage {
        chat_id: Uuid,
        message: ChatMessageEvent,
    },

    /// Private acknowledgement of a persisted message
    MessageSent { chat_id: Uuid, message_id: Uuid },

    /// Private failure signal
    ChatError {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    /// The chat no longer accepts messages
    ChatClosed { chat_id: Uuid, reason: String },

    /// The visitor is banned
    UserBanned { message: String },

    /// An administrator closed the chat (room broadcast)
    ChatClosedByAdmin {
        chat_id: Uuid,
        reason: String,
        message: String,
    },

    /// An administrator reopened the chat (room broadcast)
    ChatReopened { chat_id: Uuid },

    /// Heartbeat response
    Pong,
}

impl ServerEvent {
    pub fn chat_error(message: impl Into<String>) -> Self {
        ServerEvent::ChatError {
            message: message.into(),
            detail: None,
        }
    }
}

// =============================================================================
// Event Data Structures
// =============================================================================

/// Display fields of a message author
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageAuthor {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
}

/// Message event data
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageEvent {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub is_bot: bool,
    pub sender: MessageSender,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user: MessageAuthor,
}

impl ChatMessageEvent {
    pub fn new(message: &Message, author: &User) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            user_id: message.user_id,
            content: message.content.clone(),
            is_bot: message.is_bot,
            sender: message.sender(),
            created_at: message.created_at,
            user: MessageAuthor {
                id: author.id,
                name: author.name.clone(),
                role: author.role,
            },
        }
    }
}
