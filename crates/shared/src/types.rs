//! Common types used across LiveChat

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Display name given to visitors who start a chat without one
pub const GUEST_NAME: &str = "Guest";

/// Maximum message length accepted by the relay (after trimming)
pub const MAX_MESSAGE_LENGTH: usize = 5_000;

// =============================================================================
// Enums
// =============================================================================

/// Role of a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    User,
    Admin,
    Agent,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::User
    }
}

impl UserRole {
    /// Admins and agents answer chats and may log into the admin panel
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Admin | Self::Agent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
            Self::Agent => "AGENT",
        }
    }

    /// Parse a role from string (case insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "USER" => Some(Self::User),
            "ADMIN" => Some(Self::Admin),
            "AGENT" => Some(Self::Agent),
            _ => None,
        }
    }
}

/// Lifecycle status of a chat session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ChatStatus {
    Active,
    Closed,
}

impl Default for ChatStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl ChatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Who a message appears to come from in chat history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageSender {
    User,
    Admin,
}

// =============================================================================
// Entities
// =============================================================================

/// A visitor, admin or agent account
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: UserRole,
    pub is_banned: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Create a guest visitor account
    pub fn guest(name: Option<&str>) -> Self {
        let now = OffsetDateTime::now_utc();
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(GUEST_NAME);

        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: None,
            password_hash: None,
            role: UserRole::User,
            is_banned: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A conversation between one visitor and the support staff
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assigned_agent_id: Option<Uuid>,
    pub status: ChatStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub closed_at: Option<OffsetDateTime>,
    pub notes: Option<String>,
    pub internal_notes: Option<String>,
    pub satisfaction_rating: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ChatSession {
    /// Open a new chat owned by `user_id`
    pub fn open(user_id: Uuid) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            user_id,
            assigned_agent_id: None,
            status: ChatStatus::Active,
            closed_at: None,
            notes: None,
            internal_notes: None,
            satisfaction_rating: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Only active chats accept new messages
    pub fn is_writable(&self) -> bool {
        self.status == ChatStatus::Active
    }
}

/// An immutable chat message
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub is_bot: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Message {
    /// Bot messages are shown as coming from the support side
    pub fn sender(&self) -> MessageSender {
        if self.is_bot {
            MessageSender::Admin
        } else {
            MessageSender::User
        }
    }
}

/// Fields required to persist a new message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub is_bot: bool,
}

/// Global support settings (singleton row)
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enable_auto_response: bool,
    pub auto_response_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_auto_response: false,
            auto_response_message: None,
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

impl Settings {
    /// The auto-response template, if auto-responses are switched on and a
    /// non-blank template is configured
    pub fn auto_response_template(&self) -> Option<&str> {
        if !self.enable_auto_response {
            return None;
        }
        self.auto_response_message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}
