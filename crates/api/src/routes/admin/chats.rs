//! Admin chat management

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use livechat_shared::{ChatSession, ChatStatus, Message, User, UserRole};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::shared::{escape_csv_field, like_pattern, log_db_err, PageWindow, Paginated};
use crate::{
    auth::AdminUser,
    error::{ApiError, ApiResult},
    routes::chat::HistoryMessage,
    state::AppState,
    store::postgres::{CHAT_COLUMNS, USER_COLUMNS},
    websocket::events::ServerEvent,
};

pub const CLOSED_BY_ADMIN: &str = "closed by admin";
pub const CLOSED_BY_ADMIN_MESSAGE: &str = "This chat has been closed by support.";

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListChatsQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ExportChatsQuery {
    pub status: Option<String>,
}

/// Row of the admin chat list
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminChatSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub assigned_agent_id: Option<Uuid>,
    pub assigned_agent_name: Option<String>,
    pub status: ChatStatus,
    pub notes: Option<String>,
    pub satisfaction_rating: Option<i32>,
    pub message_count: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_message_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub closed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct MessageWithAuthorRow {
    id: Uuid,
    chat_id: Uuid,
    user_id: Uuid,
    content: String,
    is_bot: bool,
    created_at: OffsetDateTime,
    author_name: String,
    author_role: UserRole,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminMessage {
    #[serde(flatten)]
    pub message: HistoryMessage,
    pub author_name: String,
    pub author_role: UserRole,
}

impl From<MessageWithAuthorRow> for AdminMessage {
    fn from(row: MessageWithAuthorRow) -> Self {
        let message = Message {
            id: row.id,
            chat_id: row.chat_id,
            user_id: row.user_id,
            content: row.content,
            is_bot: row.is_bot,
            created_at: row.created_at,
        };
        Self {
            message: HistoryMessage::from(message),
            author_name: row.author_name,
            author_role: row.author_role,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminChatDetail {
    #[serde(flatten)]
    pub chat: ChatSession,
    pub user: User,
    pub assigned_agent: Option<User>,
    pub messages: Vec<AdminMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChatRequest {
    pub notes: Option<String>,
    pub internal_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CloseChatRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignChatRequest {
    pub agent_id: Option<Uuid>,
}

/// Parse an optional status filter
pub fn parse_status_filter(status: Option<&str>) -> Result<Option<ChatStatus>, ApiError> {
    match status.map(str::trim).filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all")) {
        None => Ok(None),
        Some(s) => ChatStatus::parse(s)
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("Unknown chat status: {s}"))),
    }
}

// =============================================================================
// Queries
// =============================================================================

const SUMMARY_FROM: &str = r#"
    FROM chat_sessions c
    JOIN users u ON u.id = c.user_id
    LEFT JOIN users a ON a.id = c.assigned_agent_id
    WHERE ($1::varchar IS NULL OR c.status = $1)
      AND ($2::text IS NULL
           OR u.name ILIKE $2
           OR c.notes ILIKE $2
           OR EXISTS (SELECT 1 FROM messages sm WHERE sm.chat_id = c.id AND sm.content ILIKE $2))
"#;

async fn fetch_summaries(
    pool: &PgPool,
    status: Option<ChatStatus>,
    pattern: Option<&str>,
    limit: Option<i64>,
    offset: i64,
) -> Result<Vec<AdminChatSummary>, sqlx::Error> {
    sqlx::query_as::<_, AdminChatSummary>(&format!(
        r#"
        SELECT c.id, c.user_id, u.name AS user_name,
               c.assigned_agent_id, a.name AS assigned_agent_name,
               c.status, c.notes, c.satisfaction_rating,
               (SELECT COUNT(*) FROM messages m WHERE m.chat_id = c.id) AS message_count,
               (SELECT MAX(m.created_at) FROM messages m WHERE m.chat_id = c.id) AS last_message_at,
               c.closed_at, c.created_at, c.updated_at
        {SUMMARY_FROM}
        ORDER BY c.updated_at DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(status.map(|s| s.as_str()))
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

async fn count_summaries(
    pool: &PgPool,
    status: Option<ChatStatus>,
    pattern: Option<&str>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) {SUMMARY_FROM}"))
        .bind(status.map(|s| s.as_str()))
        .bind(pattern)
        .fetch_one(pool)
        .await
}

/// Render chats as CSV, one row per chat
pub fn render_chats_csv(chats: &[AdminChatSummary]) -> String {
    let mut csv = String::from(
        "Chat ID,Visitor,Status,Assigned Agent,Messages,Rating,Created At,Last Message At,Closed At,Notes\n",
    );

    let timestamp = |t: Option<OffsetDateTime>| {
        t.and_then(|t| t.format(&time::format_description::well_known::Rfc3339).ok())
            .unwrap_or_default()
    };

    for chat in chats {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{}\n",
            chat.id,
            escape_csv_field(&chat.user_name),
            chat.status.as_str(),
            escape_csv_field(chat.assigned_agent_name.as_deref().unwrap_or("")),
            chat.message_count,
            chat.satisfaction_rating
                .map(|r| r.to_string())
                .unwrap_or_default(),
            timestamp(Some(chat.created_at)),
            timestamp(chat.last_message_at),
            timestamp(chat.closed_at),
            escape_csv_field(chat.notes.as_deref().unwrap_or("")),
        ));
    }

    csv
}

// =============================================================================
// Handlers
// =============================================================================

/// List chats with filters and pagination
pub async fn list_chats(
    State(state): State<AppState>,
    Query(query): Query<ListChatsQuery>,
) -> ApiResult<Json<Paginated<AdminChatSummary>>> {
    let status = parse_status_filter(query.status.as_deref())?;
    let pattern = like_pattern(query.search.as_deref());
    let window = PageWindow::new(query.page, query.limit);

    let total = count_summaries(&state.pool, status, pattern.as_deref())
        .await
        .inspect_err(|e| log_db_err("count_chats", e))?;
    let chats = fetch_summaries(
        &state.pool,
        status,
        pattern.as_deref(),
        Some(window.limit),
        window.offset,
    )
    .await
    .inspect_err(|e| log_db_err("list_chats", e))?;

    Ok(Json(Paginated::new(chats, total, window)))
}

/// Full chat detail with visitor, agent and messages
pub async fn get_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<Json<AdminChatDetail>> {
    let chat = sqlx::query_as::<_, ChatSession>(&format!(
        "SELECT {CHAT_COLUMNS} FROM chat_sessions WHERE id = $1"
    ))
    .bind(chat_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(chat.user_id)
        .fetch_one(&state.pool)
        .await?;

    let assigned_agent = match chat.assigned_agent_id {
        Some(agent_id) => {
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(agent_id)
                .fetch_optional(&state.pool)
                .await?
        }
        None => None,
    };

    let messages = sqlx::query_as::<_, MessageWithAuthorRow>(
        r#"
        SELECT m.id, m.chat_id, m.user_id, m.content, m.is_bot, m.created_at,
               u.name AS author_name, u.role AS author_role
        FROM messages m
        JOIN users u ON u.id = m.user_id
        WHERE m.chat_id = $1
        ORDER BY m.created_at ASC, m.id ASC
        "#,
    )
    .bind(chat_id)
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(AdminMessage::from)
    .collect();

    Ok(Json(AdminChatDetail {
        chat,
        user,
        assigned_agent,
        messages,
    }))
}

/// Update notes on a chat
pub async fn update_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Json(req): Json<UpdateChatRequest>,
) -> ApiResult<Json<ChatSession>> {
    if req.notes.is_none() && req.internal_notes.is_none() {
        return Err(ApiError::Validation("Nothing to update".to_string()));
    }

    let chat = sqlx::query_as::<_, ChatSession>(&format!(
        r#"
        UPDATE chat_sessions
        SET notes = COALESCE($2, notes),
            internal_notes = COALESCE($3, internal_notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {CHAT_COLUMNS}
        "#
    ))
    .bind(chat_id)
    .bind(&req.notes)
    .bind(&req.internal_notes)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(chat))
}

/// Permanently delete a chat and its messages
pub async fn delete_chat(
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.auto_responder().cancel(chat_id).await;

    let result = sqlx::query("DELETE FROM chat_sessions WHERE id = $1")
        .bind(chat_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    tracing::info!(chat_id = %chat_id, admin_id = %admin.id, "Chat deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Close a chat and notify the room
pub async fn close_chat(
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    Path(chat_id): Path<Uuid>,
    req: Option<Json<CloseChatRequest>>,
) -> ApiResult<Json<ChatSession>> {
    let reason = req
        .and_then(|Json(req)| req.reason)
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| CLOSED_BY_ADMIN.to_string());

    let chat = state
        .store
        .close_chat(chat_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    state.auto_responder().cancel(chat_id).await;

    state
        .hub
        .broadcast(
            chat_id,
            ServerEvent::ChatClosedByAdmin {
                chat_id,
                reason: reason.clone(),
                message: CLOSED_BY_ADMIN_MESSAGE.to_string(),
            },
        )
        .await;

    tracing::info!(
        chat_id = %chat_id,
        admin_id = %admin.id,
        reason = %reason,
        "Chat closed by admin"
    );

    Ok(Json(chat))
}

/// Reopen a closed chat and notify the room
pub async fn reopen_chat(
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<Json<ChatSession>> {
    let chat = state
        .store
        .activate_chat(chat_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    state
        .hub
        .broadcast(chat_id, ServerEvent::ChatReopened { chat_id })
        .await;

    tracing::info!(chat_id = %chat_id, admin_id = %admin.id, "Chat reopened");

    Ok(Json(chat))
}

/// Assign a chat to a staff member, or unassign with `null`
pub async fn assign_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Json(req): Json<AssignChatRequest>,
) -> ApiResult<Json<ChatSession>> {
    if let Some(agent_id) = req.agent_id {
        let role: Option<UserRole> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(agent_id)
            .fetch_optional(&state.pool)
            .await?;

        match role {
            Some(role) if role.is_staff() => {}
            Some(_) => {
                return Err(ApiError::Validation(
                    "Chats can only be assigned to admins or agents".to_string(),
                ))
            }
            None => return Err(ApiError::BadRequest("Agent not found".to_string())),
        }
    }

    let chat = sqlx::query_as::<_, ChatSession>(&format!(
        r#"
        UPDATE chat_sessions
        SET assigned_agent_id = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {CHAT_COLUMNS}
        "#
    ))
    .bind(chat_id)
    .bind(req.agent_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    tracing::info!(chat_id = %chat_id, agent_id = ?req.agent_id, "Chat assignment updated");

    Ok(Json(chat))
}

/// Export chats as a CSV attachment
pub async fn export_chats(
    State(state): State<AppState>,
    Query(query): Query<ExportChatsQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = parse_status_filter(query.status.as_deref())?;

    let chats = fetch_summaries(&state.pool, status, None, None, 0)
        .await
        .inspect_err(|e| log_db_err("export_chats", e))?;

    let filename = format!("chats-{}.csv", OffsetDateTime::now_utc().date());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        render_chats_csv(&chats),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str, notes: Option<&str>) -> AdminChatSummary {
        let now = OffsetDateTime::now_utc();
        AdminChatSummary {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            user_name: name.to_string(),
            assigned_agent_id: None,
            assigned_agent_name: None,
            status: ChatStatus::Closed,
            notes: notes.map(str::to_string),
            satisfaction_rating: Some(4),
            message_count: 3,
            last_message_at: None,
            closed_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_parse_status_filter() {
        assert_eq!(parse_status_filter(None).unwrap(), None);
        assert_eq!(parse_status_filter(Some("all")).unwrap(), None);
        assert_eq!(
            parse_status_filter(Some("active")).unwrap(),
            Some(ChatStatus::Active)
        );
        assert!(matches!(
            parse_status_filter(Some("archived")),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_csv_has_one_row_per_chat() {
        let csv = render_chats_csv(&[summary("Ada", None), summary("Lovelace, Ada", Some("vip"))]);
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Chat ID,Visitor,Status"));
        assert!(lines[1].contains(",Ada,CLOSED,,3,4,"));
        assert!(lines[2].contains("\"Lovelace, Ada\""));
        assert!(lines[2].ends_with(",vip"));
    }
}
