//! Admin login sessions
//!
//! The cookie carries a random token; only its SHA-256 is stored, so a leaked
//! `admin_sessions` table cannot be replayed.

use livechat_shared::User;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Issues, resolves and revokes admin session tokens
#[derive(Clone)]
pub struct SessionManager {
    pool: PgPool,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(pool: PgPool, ttl_hours: i64) -> Self {
        Self {
            pool,
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Generate a secure random token
    ///
    /// Returns a 32-byte hex-encoded token (64 characters)
    pub fn generate_token() -> String {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let bytes: [u8; 32] = rng.gen();
        hex::encode(bytes)
    }

    /// Hash a token using SHA-256
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Start a session for a staff user
    ///
    /// Returns the raw token (for the cookie) and stores the hashed version.
    pub async fn create(&self, user_id: Uuid) -> Result<String, sqlx::Error> {
        let pruned = self.prune_expired().await?;
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned expired admin sessions");
        }

        let raw_token = Self::generate_token();
        let token_hash = Self::hash_token(&raw_token);
        let expires_at = OffsetDateTime::now_utc() + self.ttl;

        sqlx::query(
            r#"
            INSERT INTO admin_sessions (id, user_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(user_id = %user_id, expires_at = %expires_at, "Admin session created");

        Ok(raw_token)
    }

    /// Look up the staff user behind a token
    ///
    /// Expired sessions and accounts that lost their staff role resolve to `None`.
    pub async fn resolve(&self, raw_token: &str) -> Result<Option<User>, sqlx::Error> {
        if raw_token.is_empty() {
            return Ok(None);
        }

        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.name, u.email, u.password_hash, u.role, u.is_banned,
                   u.created_at, u.updated_at
            FROM admin_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = $1
              AND s.expires_at > NOW()
              AND u.role IN ('ADMIN', 'AGENT')
            "#,
        )
        .bind(Self::hash_token(raw_token))
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete the session behind a token, returning whether one existed
    pub async fn revoke(&self, raw_token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE token_hash = $1")
            .bind(Self::hash_token(raw_token))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn prune_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
