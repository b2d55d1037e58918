//! Visitor chat routes
//!
//! Visitors are anonymous: knowing the chat id is what grants access to it.

use axum::{
    extract::{Path, State},
    Json,
};
use livechat_shared::{ChatSession, Message, MessageSender, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    websocket::events::ServerEvent,
};

/// Longest display name a visitor may choose
pub const MAX_NAME_LENGTH: usize = 100;

pub const CLOSED_BY_VISITOR: &str = "closed by visitor";

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartChatRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartChatResponse {
    pub chat_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMessage {
    #[serde(flatten)]
    pub message: Message,
    pub sender: MessageSender,
}

impl From<Message> for HistoryMessage {
    fn from(message: Message) -> Self {
        Self {
            sender: message.sender(),
            message,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryResponse {
    #[serde(flatten)]
    pub chat: ChatSession,
    pub user_name: Option<String>,
    pub messages: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNameRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNameResponse {
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RateChatRequest {
    pub rating: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateChatResponse {
    pub chat_id: Uuid,
    pub rating: i32,
}

/// Trim a display name and check its length
pub fn validate_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::Validation(format!(
            "Name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}

// =============================================================================
// Handlers
// =============================================================================

/// Start a new chat as a guest visitor
///
/// The body is optional; without a name the visitor is called "Guest".
pub async fn start_chat(
    State(state): State<AppState>,
    req: Option<Json<StartChatRequest>>,
) -> ApiResult<Json<StartChatResponse>> {
    let req = req.map(|Json(req)| req).unwrap_or_default();
    let name = match req.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Some(validate_name(name)?),
        _ => None,
    };

    let user = User::guest(name);
    let chat = ChatSession::open(user.id);

    state.store.create_user(&user).await?;
    state.store.create_chat(&chat).await?;

    tracing::info!(chat_id = %chat.id, user_id = %user.id, "Chat started");

    Ok(Json(StartChatResponse {
        chat_id: chat.id,
        user_id: user.id,
    }))
}

/// Get a chat with its full message history
pub async fn get_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<Json<ChatHistoryResponse>> {
    let chat = state
        .store
        .find_chat(chat_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let user_name = state.store.find_user(chat.user_id).await?.map(|u| u.name);
    let messages = state
        .store
        .list_messages(chat_id)
        .await?
        .into_iter()
        .map(HistoryMessage::from)
        .collect();

    Ok(Json(ChatHistoryResponse {
        chat,
        user_name,
        messages,
    }))
}

/// Rename the visitor who owns a chat
pub async fn update_name(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Json(req): Json<UpdateNameRequest>,
) -> ApiResult<Json<UpdateNameResponse>> {
    let name = validate_name(&req.name)?;

    let chat = state
        .store
        .find_chat(chat_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !state.store.rename_user(chat.user_id, name).await? {
        return Err(ApiError::NotFound);
    }

    Ok(Json(UpdateNameResponse {
        user_id: chat.user_id,
        name: name.to_string(),
    }))
}

/// Close a chat from the visitor side
pub async fn close_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<Json<ChatSession>> {
    let chat = state
        .store
        .close_chat(chat_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    state.auto_responder().cancel(chat_id).await;

    // Broadcast to everyone still joined to the chat
    state
        .hub
        .broadcast(
            chat_id,
            ServerEvent::ChatClosed {
                chat_id,
                reason: CLOSED_BY_VISITOR.to_string(),
            },
        )
        .await;

    tracing::info!(chat_id = %chat_id, "Chat closed by visitor");

    Ok(Json(chat))
}

/// Record the visitor's satisfaction rating
pub async fn rate_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Json(req): Json<RateChatRequest>,
) -> ApiResult<Json<RateChatResponse>> {
    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    if !state.store.rate_chat(chat_id, req.rating).await? {
        return Err(ApiError::NotFound);
    }

    Ok(Json(RateChatResponse {
        chat_id,
        rating: req.rating,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Ada ").unwrap(), "Ada");
        assert!(matches!(validate_name("   "), Err(ApiError::Validation(_))));
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_history_message_sender() {
        let message = Message {
            id: Uuid::new_v4(),
            chat_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            content: "hi".into(),
            is_bot: true,
            created_at: time::OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(HistoryMessage::from(message)).unwrap();
        assert_eq!(json["sender"], "ADMIN");
        assert_eq!(json["isBot"], true);
        assert_eq!(json["content"], "hi");
    }
}
