//! Admin user management

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use livechat_shared::{User, UserRole};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::shared::{like_pattern, log_db_err, PageWindow, Paginated};
use crate::{
    auth::AdminUser,
    error::{ApiError, ApiResult},
    state::AppState,
    store::postgres::USER_COLUMNS,
};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub search: Option<String>,
    pub role: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub is_banned: bool,
    pub chat_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub role: Option<String>,
    pub is_banned: Option<bool>,
}

const USERS_FROM: &str = r#"
    FROM users u
    WHERE ($1::varchar IS NULL OR u.role = $1)
      AND ($2::text IS NULL OR u.name ILIKE $2 OR u.email ILIKE $2)
"#;

/// List users with search and pagination
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<Paginated<AdminUserSummary>>> {
    let role = match query.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => Some(
            UserRole::parse(r)
                .ok_or_else(|| ApiError::Validation(format!("Unknown role: {r}")))?,
        ),
        None => None,
    };
    let pattern = like_pattern(query.search.as_deref());
    let window = PageWindow::new(query.page, query.limit);

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {USERS_FROM}"))
        .bind(role.map(|r| r.as_str()))
        .bind(pattern.as_deref())
        .fetch_one(&state.pool)
        .await
        .inspect_err(|e| log_db_err("count_users", e))?;

    let users = sqlx::query_as::<_, AdminUserSummary>(&format!(
        r#"
        SELECT u.id, u.name, u.email, u.role, u.is_banned, u.created_at,
               (SELECT COUNT(*) FROM chat_sessions c WHERE c.user_id = u.id) AS chat_count
        {USERS_FROM}
        ORDER BY u.created_at DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(role.map(|r| r.as_str()))
    .bind(pattern.as_deref())
    .bind(window.limit)
    .bind(window.offset)
    .fetch_all(&state.pool)
    .await
    .inspect_err(|e| log_db_err("list_users", e))?;

    Ok(Json(Paginated::new(users, total, window)))
}

/// Change a user's role or ban flag
pub async fn update_user(
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    let role = match req.role.as_deref() {
        Some(r) => Some(
            UserRole::parse(r).ok_or_else(|| ApiError::Validation(format!("Unknown role: {r}")))?,
        ),
        None => None,
    };

    if role.is_none() && req.is_banned.is_none() {
        return Err(ApiError::Validation("Nothing to update".to_string()));
    }

    let changes_own_access =
        role.is_some_and(|r| r != admin.role) || req.is_banned == Some(true);
    if user_id == admin.id && changes_own_access {
        return Err(ApiError::BadRequest(
            "You cannot change your own role or ban yourself".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET role = COALESCE($2::varchar, role),
            is_banned = COALESCE($3, is_banned),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(role.map(|r| r.as_str()))
    .bind(req.is_banned)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    tracing::info!(
        user_id = %user_id,
        admin_id = %admin.id,
        role = user.role.as_str(),
        is_banned = user.is_banned,
        "User updated"
    );

    Ok(Json(user))
}

/// Delete a user together with their chats
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if user_id == admin.id {
        return Err(ApiError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    // Chats cascade with the user; drop their pending auto-responses first
    let chat_ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM chat_sessions WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(&state.pool)
        .await?;
    for chat_id in chat_ids {
        state.auto_responder().cancel(chat_id).await;
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    tracing::info!(user_id = %user_id, admin_id = %admin.id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}
