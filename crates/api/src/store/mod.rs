//! Session store access for the realtime relay and visitor routes
//!
//! The relay never talks to the database directly; it goes through [`ChatStore`]
//! so the same pipeline runs against PostgreSQL in production and against
//! [`InMemoryChatStore`] in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use livechat_shared::{ChatSession, Message, NewMessage, Settings, User};
use uuid::Uuid;

pub use memory::InMemoryChatStore;
pub use postgres::PgChatStore;

/// Errors surfaced by a [`ChatStore`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations needed by the relay and the visitor chat routes
#[async_trait]
pub trait ChatStore: Send + Sync {
    // Users
    async fn create_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Any account with the ADMIN role, oldest first
    async fn find_any_admin(&self) -> StoreResult<Option<User>>;
    /// Returns false when the user does not exist
    async fn rename_user(&self, id: Uuid, name: &str) -> StoreResult<bool>;

    // Chat sessions
    async fn create_chat(&self, chat: &ChatSession) -> StoreResult<()>;
    async fn find_chat(&self, id: Uuid) -> StoreResult<Option<ChatSession>>;
    /// Force a chat back to ACTIVE and clear `closed_at`
    async fn activate_chat(&self, id: Uuid) -> StoreResult<Option<ChatSession>>;
    /// Mark a chat CLOSED, stamping `closed_at`
    async fn close_chat(&self, id: Uuid) -> StoreResult<Option<ChatSession>>;
    /// Returns false when the chat does not exist
    async fn rate_chat(&self, id: Uuid, rating: i32) -> StoreResult<bool>;

    // Messages
    async fn create_message(&self, message: NewMessage) -> StoreResult<Message>;
    async fn count_bot_messages(&self, chat_id: Uuid) -> StoreResult<i64>;
    /// All messages of a chat, oldest first
    async fn list_messages(&self, chat_id: Uuid) -> StoreResult<Vec<Message>>;

    // Settings
    async fn settings(&self) -> StoreResult<Settings>;
}
