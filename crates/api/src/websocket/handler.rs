//! WebSocket handler for Axum
//!
//! Upgrades `GET /ws`, binds an admin session when the cookie carries one, and
//! routes inbound frames to the relay.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::state::AppState;

use super::{
    connection::Connection,
    events::{ClientEvent, ServerEvent},
    relay::{MessageRelay, SEND_FAILED},
};

pub const INVALID_EVENT_FORMAT: &str = "invalid event format";
const SEND_MESSAGE_TYPE: &str = "send-message";

/// WebSocket handler - upgrades HTTP connection to WebSocket
///
/// Visitors connect anonymously; staff are recognised by their session cookie.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
    cookies: Cookies,
) -> Response {
    let admin_user_id = match cookies.get(&app_state.config.session_cookie_name) {
        Some(cookie) => match app_state.sessions.resolve(cookie.value()).await {
            Ok(Some(user)) => Some(user.id),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = ?e, "WebSocket auth: failed to resolve admin session");
                None
            }
        },
        None => None,
    };

    tracing::info!(admin_user_id = ?admin_user_id, "WebSocket connection upgrade requested");

    let relay = Arc::clone(&app_state.relay);
    ws.on_upgrade(move |socket| handle_socket(socket, admin_user_id, relay))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, admin_user_id: Option<Uuid>, relay: Arc<MessageRelay>) {
    let (mut sender, mut receiver) = socket.split();

    // Create channel for sending events to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let hub = relay.hub().clone();
    let conn = hub.add_connection(Connection::new(admin_user_id, tx)).await;
    let connection_id = conn.id;

    // Send connection acknowledgment
    let _ = conn.send(ServerEvent::Connected { connection_id });

    // Spawn task to send messages to client
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break; // Connection closed
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Failed to serialize WebSocket event");
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, error = ?e, "WebSocket read error");
                break;
            }
        };

        match msg {
            Message::Text(text) => match parse_frame(&text) {
                Ok(event) => handle_client_event(event, &conn, &relay).await,
                Err(rejection) => {
                    tracing::warn!(connection_id = %connection_id, "Failed to parse client event");
                    let _ = conn.send(rejection);
                }
            },
            Message::Close(_) => {
                tracing::info!(connection_id = %connection_id, "WebSocket close frame received");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                // Axum handles ping/pong automatically
            }
            Message::Binary(_) => {}
        }
    }

    // Cleanup on disconnect
    hub.remove_connection(&connection_id).await;
    send_task.abort();
}

/// Decode one text frame, or build the private reply for a bad one
///
/// A `send-message` whose payload does not decode is a failed send, not an
/// unknown event.
pub fn parse_frame(text: &str) -> Result<ClientEvent, ServerEvent> {
    serde_json::from_str::<ClientEvent>(text).map_err(|e| {
        let is_send = serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .and_then(|frame| frame.get("type")?.as_str().map(|t| t == SEND_MESSAGE_TYPE))
            .unwrap_or(false);

        if is_send {
            ServerEvent::ChatError {
                message: SEND_FAILED.to_string(),
                detail: Some(e.to_string()),
            }
        } else {
            ServerEvent::chat_error(INVALID_EVENT_FORMAT)
        }
    })
}

/// Dispatch one client event
pub async fn handle_client_event(event: ClientEvent, conn: &Arc<Connection>, relay: &MessageRelay) {
    match event {
        ClientEvent::JoinChat { chat_id } => match Uuid::parse_str(chat_id.trim()) {
            Ok(chat_id) => {
                relay.hub().join_chat(conn, chat_id).await;
            }
            Err(_) => {
                tracing::debug!(
                    connection_id = %conn.id,
                    chat_id = %chat_id,
                    "Ignoring join for malformed chat id"
                );
            }
        },

        ClientEvent::LeaveChat { chat_id } => {
            if let Ok(chat_id) = Uuid::parse_str(chat_id.trim()) {
                relay.hub().leave_chat(conn, chat_id).await;
            }
        }

        ClientEvent::SendMessage(payload) => relay.handle_send(conn, payload).await,

        ClientEvent::Ping => {
            let _ = conn.send(ServerEvent::Pong);
        }
    }
}
