//! Startup tasks run before the server accepts traffic

use livechat_shared::{User, UserRole};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::hash_password;

/// Outcome of [`ensure_admin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminSeed {
    Created(Uuid),
    AlreadyExists(Uuid),
}

/// Create the bootstrap ADMIN account if no user has this email yet
///
/// An existing account is left untouched so a changed `ADMIN_PASSWORD` never
/// silently resets a password set through other means.
pub async fn ensure_admin(pool: &PgPool, email: &str, password: &str) -> anyhow::Result<AdminSeed> {
    let email = email.trim().to_lowercase();

    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE LOWER(email) = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?;
    if let Some(id) = existing {
        return Ok(AdminSeed::AlreadyExists(id));
    }

    let now = OffsetDateTime::now_utc();
    let admin = User {
        id: Uuid::new_v4(),
        name: "Administrator".to_string(),
        email: Some(email),
        password_hash: Some(hash_password(password)?),
        role: UserRole::Admin,
        is_banned: false,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, is_banned, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(admin.id)
    .bind(&admin.name)
    .bind(&admin.email)
    .bind(&admin.password_hash)
    .bind(admin.role)
    .bind(admin.is_banned)
    .bind(admin.created_at)
    .bind(admin.updated_at)
    .execute(pool)
    .await?;

    Ok(AdminSeed::Created(admin.id))
}
