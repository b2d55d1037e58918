//! In-process [`ChatStore`] used by tests and local tooling

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use livechat_shared::{ChatSession, ChatStatus, Message, NewMessage, Settings, User, UserRole};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ChatStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    chats: HashMap<Uuid, ChatSession>,
    /// Insertion order doubles as creation order
    messages: Vec<Message>,
    settings: Settings,
}

/// Keeps every table in memory behind a single lock
#[derive(Default)]
pub struct InMemoryChatStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn set_settings(&self, settings: Settings) {
        self.tables.write().await.settings = settings;
    }

    pub async fn set_banned(&self, user_id: Uuid, banned: bool) {
        if let Some(user) = self.tables.write().await.users.get_mut(&user_id) {
            user.is_banned = banned;
        }
    }

    /// Insert a staff account with the given role
    pub async fn add_staff(&self, name: &str, role: UserRole) -> User {
        let mut user = User::guest(Some(name));
        user.role = role;
        self.tables.write().await.users.insert(user.id, user.clone());
        user
    }

    /// Insert a visitor with an open chat
    pub async fn add_visitor_chat(&self, name: &str) -> (User, ChatSession) {
        let user = User::guest(Some(name));
        let chat = ChatSession::open(user.id);
        let mut tables = self.tables.write().await;
        tables.users.insert(user.id, user.clone());
        tables.chats.insert(chat.id, chat.clone());
        (user, chat)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store switched off".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        self.check_available()?;
        self.tables.write().await.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check_available()?;
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_any_admin(&self) -> StoreResult<Option<User>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.role == UserRole::Admin)
            .min_by_key(|u| u.created_at)
            .cloned())
    }

    async fn rename_user(&self, id: Uuid, name: &str) -> StoreResult<bool> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.name = name.to_string();
                user.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_chat(&self, chat: &ChatSession) -> StoreResult<()> {
        self.check_available()?;
        self.tables.write().await.chats.insert(chat.id, chat.clone());
        Ok(())
    }

    async fn find_chat(&self, id: Uuid) -> StoreResult<Option<ChatSession>> {
        self.check_available()?;
        Ok(self.tables.read().await.chats.get(&id).cloned())
    }

    async fn activate_chat(&self, id: Uuid) -> StoreResult<Option<ChatSession>> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        Ok(tables.chats.get_mut(&id).map(|chat| {
            chat.status = ChatStatus::Active;
            chat.closed_at = None;
            chat.updated_at = OffsetDateTime::now_utc();
            chat.clone()
        }))
    }

    async fn close_chat(&self, id: Uuid) -> StoreResult<Option<ChatSession>> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        Ok(tables.chats.get_mut(&id).map(|chat| {
            let now = OffsetDateTime::now_utc();
            chat.status = ChatStatus::Closed;
            chat.closed_at = Some(now);
            chat.updated_at = now;
            chat.clone()
        }))
    }

    async fn rate_chat(&self, id: Uuid, rating: i32) -> StoreResult<bool> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        match tables.chats.get_mut(&id) {
            Some(chat) => {
                chat.satisfaction_rating = Some(rating);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_message(&self, message: NewMessage) -> StoreResult<Message> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if !tables.chats.contains_key(&message.chat_id) {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }

        let message = Message {
            id: Uuid::new_v4(),
            chat_id: message.chat_id,
            user_id: message.user_id,
            content: message.content,
            is_bot: message.is_bot,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn count_bot_messages(&self, chat_id: Uuid) -> StoreResult<i64> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id && m.is_bot)
            .count() as i64)
    }

    async fn list_messages(&self, chat_id: Uuid) -> StoreResult<Vec<Message>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect())
    }

    async fn settings(&self) -> StoreResult<Settings> {
        self.check_available()?;
        Ok(self.tables.read().await.settings.clone())
    }
}
