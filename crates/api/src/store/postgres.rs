//! PostgreSQL-backed [`ChatStore`]

use async_trait::async_trait;
use livechat_shared::{ChatSession, Message, NewMessage, Settings, User};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ChatStore, StoreResult};

pub(crate) const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, is_banned, created_at, updated_at";

pub(crate) const CHAT_COLUMNS: &str = "id, user_id, assigned_agent_id, status, closed_at, notes, \
     internal_notes, satisfaction_rating, created_at, updated_at";

#[derive(Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, is_banned, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.is_banned)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_any_admin(&self) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = 'ADMIN' ORDER BY created_at ASC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn rename_user(&self, id: Uuid, name: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET name = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_chat(&self, chat: &ChatSession) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_sessions (id, user_id, assigned_agent_id, status, closed_at,
                                       notes, internal_notes, satisfaction_rating,
                                       created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(chat.id)
        .bind(chat.user_id)
        .bind(chat.assigned_agent_id)
        .bind(chat.status)
        .bind(chat.closed_at)
        .bind(&chat.notes)
        .bind(&chat.internal_notes)
        .bind(chat.satisfaction_rating)
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_chat(&self, id: Uuid) -> StoreResult<Option<ChatSession>> {
        let chat = sqlx::query_as::<_, ChatSession>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chat_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(chat)
    }

    async fn activate_chat(&self, id: Uuid) -> StoreResult<Option<ChatSession>> {
        let chat = sqlx::query_as::<_, ChatSession>(&format!(
            r#"
            UPDATE chat_sessions
            SET status = 'ACTIVE', closed_at = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(chat)
    }

    async fn close_chat(&self, id: Uuid) -> StoreResult<Option<ChatSession>> {
        let chat = sqlx::query_as::<_, ChatSession>(&format!(
            r#"
            UPDATE chat_sessions
            SET status = 'CLOSED', closed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(chat)
    }

    async fn rate_chat(&self, id: Uuid, rating: i32) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE chat_sessions SET satisfaction_rating = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(rating)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_message(&self, message: NewMessage) -> StoreResult<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, chat_id, user_id, content, is_bot)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, chat_id, user_id, content, is_bot, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message.chat_id)
        .bind(message.user_id)
        .bind(&message.content)
        .bind(message.is_bot)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    async fn count_bot_messages(&self, chat_id: Uuid) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = $1 AND is_bot = TRUE")
                .bind(chat_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn list_messages(&self, chat_id: Uuid) -> StoreResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, chat_id, user_id, content, is_bot, created_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn settings(&self) -> StoreResult<Settings> {
        let settings = sqlx::query_as::<_, Settings>(
            "SELECT enable_auto_response, auto_response_message, updated_at FROM settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livechat_shared::{create_pool, run_migrations, ChatStatus};

    async fn store() -> PgChatStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url, 2).await.expect("Failed to create pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        PgChatStore::new(pool)
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_chat_round_trip() {
        let store = store().await;
        let user = User::guest(Some("Round Trip"));
        store.create_user(&user).await.unwrap();
        let chat = ChatSession::open(user.id);
        store.create_chat(&chat).await.unwrap();

        for (content, is_bot) in [("hello", false), ("hi there", true)] {
            store
                .create_message(NewMessage {
                    chat_id: chat.id,
                    user_id: user.id,
                    content: content.into(),
                    is_bot,
                })
                .await
                .unwrap();
        }

        let messages = store.list_messages(chat.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].created_at <= messages[1].created_at);
        assert_eq!(store.count_bot_messages(chat.id).await.unwrap(), 1);

        let closed = store.close_chat(chat.id).await.unwrap().unwrap();
        assert_eq!(closed.status, ChatStatus::Closed);
        assert!(closed.closed_at.is_some());

        let reopened = store.activate_chat(chat.id).await.unwrap().unwrap();
        assert_eq!(reopened.status, ChatStatus::Active);
        assert!(reopened.closed_at.is_none());
    }
}
