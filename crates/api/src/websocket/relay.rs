//! Message send pipeline
//!
//! Validates a `send-message` request, persists it, reactivates the chat,
//! broadcasts to the chat room and acknowledges the sender. Every rejection is
//! reported only to the requesting connection.

use std::sync::Arc;

use livechat_shared::{ChatSession, Message, NewMessage, User, MAX_MESSAGE_LENGTH};
use uuid::Uuid;

use super::auto_response::AutoResponder;
use super::connection::Connection;
use super::events::{ChatMessageEvent, SendMessagePayload, ServerEvent};
use super::state::RelayHub;
use crate::store::{ChatStore, StoreError};

pub const CHAT_ID_REQUIRED: &str = "chat id required";
pub const CHAT_NOT_FOUND: &str = "chat not found";
pub const ADMIN_USER_NOT_FOUND: &str = "admin user not found";
pub const ADMIN_SESSION_REQUIRED: &str = "admin session required";
pub const CONTENT_REQUIRED: &str = "content required";
pub const CONTENT_TOO_LONG: &str = "content too long";
pub const SEND_FAILED: &str = "failed to send message";

pub const CHAT_CLOSED_REASON: &str = "chat is closed";
pub const USER_BANNED_MESSAGE: &str = "You have been banned from this chat";

/// Business-rule rejections
#[derive(Debug, thiserror::Error)]
pub enum PolicyViolation {
    #[error("chat {chat_id} is closed")]
    ChatClosed { chat_id: Uuid, reason: String },
    #[error("user is banned")]
    UserBanned,
    #[error("admin session required")]
    AdminSessionRequired,
}

/// Why a send was rejected
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl RelayError {
    /// The private event sent back to the requester
    pub fn to_event(&self) -> ServerEvent {
        match self {
            RelayError::Validation(message) | RelayError::NotFound(message) => {
                ServerEvent::chat_error(*message)
            }
            RelayError::Policy(PolicyViolation::ChatClosed { chat_id, reason }) => {
                ServerEvent::ChatClosed {
                    chat_id: *chat_id,
                    reason: reason.clone(),
                }
            }
            RelayError::Policy(PolicyViolation::UserBanned) => ServerEvent::UserBanned {
                message: USER_BANNED_MESSAGE.to_string(),
            },
            RelayError::Policy(PolicyViolation::AdminSessionRequired) => {
                ServerEvent::chat_error(ADMIN_SESSION_REQUIRED)
            }
            RelayError::Store(e) => ServerEvent::ChatError {
                message: SEND_FAILED.to_string(),
                detail: Some(e.to_string()),
            },
        }
    }
}

/// Runs the send pipeline for every connection
pub struct MessageRelay {
    store: Arc<dyn ChatStore>,
    hub: RelayHub,
    auto_responder: AutoResponder,
    require_admin_session: bool,
}

impl MessageRelay {
    pub fn new(
        store: Arc<dyn ChatStore>,
        hub: RelayHub,
        auto_responder: AutoResponder,
        require_admin_session: bool,
    ) -> Self {
        Self {
            store,
            hub,
            auto_responder,
            require_admin_session,
        }
    }

    pub fn hub(&self) -> &RelayHub {
        &self.hub
    }

    pub fn auto_responder(&self) -> &AutoResponder {
        &self.auto_responder
    }

    /// Handle a `send-message` event, replying privately on failure
    pub async fn handle_send(&self, conn: &Connection, payload: SendMessagePayload) {
        if let Err(e) = self.send_message(conn, payload).await {
            match &e {
                RelayError::Store(err) => {
                    tracing::error!(
                        connection_id = %conn.id,
                        error = ?err,
                        "Failed to send message"
                    );
                }
                RelayError::Policy(violation) => {
                    tracing::warn!(
                        connection_id = %conn.id,
                        reason = %violation,
                        "Message rejected"
                    );
                }
                RelayError::Validation(_) | RelayError::NotFound(_) => {
                    tracing::debug!(connection_id = %conn.id, reason = %e, "Message rejected");
                }
            }

            if conn.send(e.to_event()).is_err() {
                tracing::debug!(connection_id = %conn.id, "Requester went away before rejection");
            }
        }
    }

    /// Validate, persist and broadcast one message
    pub async fn send_message(
        &self,
        conn: &Connection,
        payload: SendMessagePayload,
    ) -> Result<Message, RelayError> {
        let as_staff = payload.acts_as_staff();

        let raw_chat_id = payload
            .chat_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(RelayError::Validation(CHAT_ID_REQUIRED))?;

        // An id that is not a UUID cannot name an existing chat
        let chat_id =
            Uuid::parse_str(raw_chat_id).map_err(|_| RelayError::NotFound(CHAT_NOT_FOUND))?;

        let chat = self
            .store
            .find_chat(chat_id)
            .await?
            .ok_or(RelayError::NotFound(CHAT_NOT_FOUND))?;

        if !chat.is_writable() {
            return Err(PolicyViolation::ChatClosed {
                chat_id,
                reason: CHAT_CLOSED_REASON.to_string(),
            }
            .into());
        }

        let author = if as_staff {
            self.resolve_staff_author(conn, payload.user_id.as_deref())
                .await?
        } else {
            self.resolve_visitor_author(&chat).await?
        };

        let content = payload.content.as_deref().map(str::trim).unwrap_or("");
        if content.is_empty() {
            return Err(RelayError::Validation(CONTENT_REQUIRED));
        }
        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(RelayError::Validation(CONTENT_TOO_LONG));
        }

        let message = self
            .store
            .create_message(NewMessage {
                chat_id,
                user_id: author.id,
                content: content.to_string(),
                is_bot: as_staff,
            })
            .await?;

        tracing::info!(
            chat_id = %chat_id,
            message_id = %message.id,
            author_id = %author.id,
            is_bot = message.is_bot,
            "Message persisted"
        );

        self.store.activate_chat(chat_id).await?;

        self.hub
            .broadcast(
                chat_id,
                ServerEvent::ReceiveMessage {
                    chat_id,
                    message: ChatMessageEvent::new(&message, &author),
                },
            )
            .await;

        if conn
            .send(ServerEvent::MessageSent {
                chat_id,
                message_id: message.id,
            })
            .is_err()
        {
            tracing::debug!(connection_id = %conn.id, "Sender went away before acknowledgement");
        }

        // The message is delivered by now; a failed lookup only skips the auto-reply
        if !as_staff {
            match self.auto_reply_template(chat_id).await {
                Ok(Some(template)) => {
                    self.auto_responder.schedule(chat_id, template).await;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        chat_id = %chat_id,
                        error = %e,
                        "Auto-reply lookup failed, not scheduling"
                    );
                }
            }
        }

        Ok(message)
    }

    async fn resolve_staff_author(
        &self,
        conn: &Connection,
        requested: Option<&str>,
    ) -> Result<User, RelayError> {
        if self.require_admin_session && conn.admin_user_id.is_none() {
            return Err(PolicyViolation::AdminSessionRequired.into());
        }

        let requested = requested
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                Uuid::parse_str(id).map_err(|_| RelayError::NotFound(ADMIN_USER_NOT_FOUND))
            })
            .transpose()?;

        if let Some(user_id) = requested.or(conn.admin_user_id) {
            return self
                .store
                .find_user(user_id)
                .await?
                .ok_or(RelayError::NotFound(ADMIN_USER_NOT_FOUND));
        }

        self.store
            .find_any_admin()
            .await?
            .ok_or(RelayError::NotFound(ADMIN_USER_NOT_FOUND))
    }

    /// Visitors always speak as the chat owner
    async fn resolve_visitor_author(&self, chat: &ChatSession) -> Result<User, RelayError> {
        let owner = self
            .store
            .find_user(chat.user_id)
            .await?
            .ok_or(RelayError::NotFound(CHAT_NOT_FOUND))?;

        if owner.is_banned {
            return Err(PolicyViolation::UserBanned.into());
        }
        Ok(owner)
    }

    /// The template to send if this chat still needs its first automatic reply
    async fn auto_reply_template(&self, chat_id: Uuid) -> Result<Option<String>, RelayError> {
        if self.store.count_bot_messages(chat_id).await? > 0 {
            return Ok(None);
        }
        let settings = self.store.settings().await?;
        Ok(settings.auto_response_template().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryChatStore, StoreResult};
    use livechat_shared::{ChatStatus, Settings, UserRole};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Harness {
        store: Arc<InMemoryChatStore>,
        hub: RelayHub,
        relay: MessageRelay,
    }

    fn harness_with(require_admin_session: bool) -> Harness {
        let store = Arc::new(InMemoryChatStore::new());
        let hub = RelayHub::new();
        let responder =
            AutoResponder::new(store.clone(), hub.clone(), Duration::from_millis(1_000));
        let relay = MessageRelay::new(store.clone(), hub.clone(), responder, require_admin_session);
        Harness { store, hub, relay }
    }

    fn harness() -> Harness {
        harness_with(false)
    }

    async fn connect(
        hub: &RelayHub,
        admin: Option<Uuid>,
    ) -> (Arc<Connection>, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (hub.add_connection(Connection::new(admin, tx)).await, rx)
    }

    fn visitor_send(chat_id: Uuid, content: &str) -> SendMessagePayload {
        SendMessagePayload {
            chat_id: Some(chat_id.to_string()),
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    fn admin_send(chat_id: Uuid, content: &str) -> SendMessagePayload {
        SendMessagePayload {
            is_admin: Some(true),
            ..visitor_send(chat_id, content)
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_missing_chat_id() {
        let h = harness();
        let (conn, _rx) = connect(&h.hub, None).await;

        let payload = SendMessagePayload {
            chat_id: Some("   ".into()),
            content: Some("hi".into()),
            ..Default::default()
        };
        let err = h.relay.send_message(&conn, payload).await.unwrap_err();
        assert!(matches!(err, RelayError::Validation(CHAT_ID_REQUIRED)));
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_chat_id() {
        let h = harness();
        let (conn, _rx) = connect(&h.hub, None).await;

        let err = h
            .relay
            .send_message(&conn, visitor_send(Uuid::new_v4(), "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::NotFound(CHAT_NOT_FOUND)));

        let payload = SendMessagePayload {
            chat_id: Some("not-a-uuid".into()),
            content: Some("hi".into()),
            ..Default::default()
        };
        let err = h.relay.send_message(&conn, payload).await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound(CHAT_NOT_FOUND)));
    }

    #[tokio::test]
    async fn test_closed_chat_rejected_without_write() {
        let h = harness();
        let (_, chat) = h.store.add_visitor_chat("Ada").await;
        h.store.close_chat(chat.id).await.unwrap();
        let (conn, mut rx) = connect(&h.hub, None).await;
        h.hub.join_chat(&conn, chat.id).await;

        h.relay.handle_send(&conn, visitor_send(chat.id, "hello")).await;

        assert!(h.store.list_messages(chat.id).await.unwrap().is_empty());
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ServerEvent::ChatClosed { chat_id, reason } => {
                assert_eq!(*chat_id, chat.id);
                assert_eq!(reason, CHAT_CLOSED_REASON);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_banned_visitor_rejected_without_write() {
        let h = harness();
        let (user, chat) = h.store.add_visitor_chat("Ada").await;
        h.store.set_banned(user.id, true).await;
        let (conn, mut rx) = connect(&h.hub, None).await;

        h.relay.handle_send(&conn, visitor_send(chat.id, "hello")).await;

        assert!(h.store.list_messages(chat.id).await.unwrap().is_empty());
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ServerEvent::UserBanned { .. }));
    }

    #[tokio::test]
    async fn test_blank_and_oversized_content() {
        let h = harness();
        let (_, chat) = h.store.add_visitor_chat("Ada").await;
        let (conn, mut rx) = connect(&h.hub, None).await;

        h.relay.handle_send(&conn, visitor_send(chat.id, " \n\t ")).await;
        let payload = SendMessagePayload {
            chat_id: Some(chat.id.to_string()),
            ..Default::default()
        };
        h.relay.handle_send(&conn, payload).await;

        let too_long = "x".repeat(MAX_MESSAGE_LENGTH + 1);
        h.relay.handle_send(&conn, visitor_send(chat.id, &too_long)).await;

        assert!(h.store.list_messages(chat.id).await.unwrap().is_empty());
        let messages: Vec<_> = drain(&mut rx)
            .into_iter()
            .map(|e| match e {
                ServerEvent::ChatError { message, .. } => message,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(messages, vec![CONTENT_REQUIRED, CONTENT_REQUIRED, CONTENT_TOO_LONG]);
    }

    #[tokio::test]
    async fn test_visitor_message_authored_by_owner() {
        let h = harness();
        let (owner, chat) = h.store.add_visitor_chat("Ada").await;
        let impostor = h.store.add_staff("Mallory", UserRole::User).await;
        let (conn, mut rx) = connect(&h.hub, None).await;
        h.hub.join_chat(&conn, chat.id).await;

        let payload = SendMessagePayload {
            user_id: Some(impostor.id.to_string()),
            ..visitor_send(chat.id, "  hello  ")
        };
        let message = h.relay.send_message(&conn, payload).await.unwrap();

        assert_eq!(message.user_id, owner.id);
        assert_eq!(message.content, "hello");
        assert!(!message.is_bot);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        match &events[0] {
            ServerEvent::ReceiveMessage { message: event, .. } => {
                assert_eq!(event.user.name, "Ada");
                assert_eq!(event.content, "hello");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            events[1],
            ServerEvent::MessageSent { message_id, .. } if message_id == message.id
        ));
    }

    #[tokio::test]
    async fn test_send_reactivates_chat() {
        let h = harness();
        let admin = h.store.add_staff("Support", UserRole::Admin).await;
        let (_, chat) = h.store.add_visitor_chat("Ada").await;
        let (conn, _rx) = connect(&h.hub, Some(admin.id)).await;

        h.relay
            .send_message(&conn, admin_send(chat.id, "hi"))
            .await
            .unwrap();

        let chat = h.store.find_chat(chat.id).await.unwrap().unwrap();
        assert_eq!(chat.status, ChatStatus::Active);
        assert!(chat.closed_at.is_none());
    }

    #[tokio::test]
    async fn test_staff_author_resolution_order() {
        let h = harness();
        let admin = h.store.add_staff("Admin", UserRole::Admin).await;
        let agent = h.store.add_staff("Agent", UserRole::Agent).await;
        let session_agent = h.store.add_staff("Session", UserRole::Agent).await;
        let (_, chat) = h.store.add_visitor_chat("Ada").await;

        // Explicit author wins over the session
        let (conn, _rx) = connect(&h.hub, Some(session_agent.id)).await;
        let payload = SendMessagePayload {
            user_id: Some(agent.id.to_string()),
            ..admin_send(chat.id, "one")
        };
        let message = h.relay.send_message(&conn, payload).await.unwrap();
        assert_eq!(message.user_id, agent.id);
        assert!(message.is_bot);

        // Session user next
        let message = h
            .relay
            .send_message(&conn, admin_send(chat.id, "two"))
            .await
            .unwrap();
        assert_eq!(message.user_id, session_agent.id);

        // Then any admin
        let (anon, _rx) = connect(&h.hub, None).await;
        let payload = SendMessagePayload {
            sender_role: Some("admin".into()),
            ..visitor_send(chat.id, "three")
        };
        let message = h.relay.send_message(&anon, payload).await.unwrap();
        assert_eq!(message.user_id, admin.id);
    }

    #[tokio::test]
    async fn test_admin_user_not_found() {
        let h = harness();
        let (_, chat) = h.store.add_visitor_chat("Ada").await;
        let (conn, _rx) = connect(&h.hub, None).await;

        let err = h
            .relay
            .send_message(&conn, admin_send(chat.id, "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::NotFound(ADMIN_USER_NOT_FOUND)));

        let payload = SendMessagePayload {
            user_id: Some(Uuid::new_v4().to_string()),
            ..admin_send(chat.id, "hi")
        };
        let err = h.relay.send_message(&conn, payload).await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound(ADMIN_USER_NOT_FOUND)));
        assert!(h.store.list_messages(chat.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_session_required_when_configured() {
        let h = harness_with(true);
        let admin = h.store.add_staff("Support", UserRole::Admin).await;
        let (_, chat) = h.store.add_visitor_chat("Ada").await;

        let (anon, mut rx) = connect(&h.hub, None).await;
        h.relay.handle_send(&anon, admin_send(chat.id, "hi")).await;
        match drain(&mut rx).as_slice() {
            [ServerEvent::ChatError { message, .. }] => assert_eq!(message, ADMIN_SESSION_REQUIRED),
            other => panic!("unexpected events {other:?}"),
        }

        let (staff, _rx) = connect(&h.hub, Some(admin.id)).await;
        assert!(h
            .relay
            .send_message(&staff, admin_send(chat.id, "hi"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_store_failure_reported_privately() {
        let h = harness();
        let (_, chat) = h.store.add_visitor_chat("Ada").await;
        let (member, mut member_rx) = connect(&h.hub, None).await;
        h.hub.join_chat(&member, chat.id).await;
        let (conn, mut rx) = connect(&h.hub, None).await;
        h.hub.join_chat(&conn, chat.id).await;

        h.store.set_unavailable(true);
        h.relay.handle_send(&conn, visitor_send(chat.id, "hello")).await;
        h.store.set_unavailable(false);

        match drain(&mut rx).as_slice() {
            [ServerEvent::ChatError { message, detail }] => {
                assert_eq!(message, SEND_FAILED);
                assert!(detail.is_some());
            }
            other => panic!("unexpected events {other:?}"),
        }
        assert!(drain(&mut member_rx).is_empty());
        assert!(!h.relay.auto_responder().is_pending(&chat.id).await);
    }

    #[tokio::test]
    async fn test_auto_reply_scheduled_for_first_visitor_message_only() {
        let h = harness();
        h.store.add_staff("Support", UserRole::Admin).await;
        h.store
            .set_settings(Settings {
                enable_auto_response: true,
                auto_response_message: Some("We'll be right with you".into()),
                ..Default::default()
            })
            .await;
        let (_, chat) = h.store.add_visitor_chat("Ada").await;
        let (conn, _rx) = connect(&h.hub, None).await;

        h.relay
            .send_message(&conn, admin_send(chat.id, "staff first"))
            .await
            .unwrap();
        assert!(!h.relay.auto_responder().is_pending(&chat.id).await);

        h.relay
            .send_message(&conn, visitor_send(chat.id, "hello"))
            .await
            .unwrap();
        assert!(!h.relay.auto_responder().is_pending(&chat.id).await);
    }

    #[tokio::test]
    async fn test_auto_reply_requires_template() {
        let h = harness();
        h.store
            .set_settings(Settings {
                enable_auto_response: true,
                auto_response_message: Some("   ".into()),
                ..Default::default()
            })
            .await;
        let (_, chat) = h.store.add_visitor_chat("Ada").await;
        let (conn, _rx) = connect(&h.hub, None).await;

        h.relay
            .send_message(&conn, visitor_send(chat.id, "hello"))
            .await
            .unwrap();
        assert!(!h.relay.auto_responder().is_pending(&chat.id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_reply_follows_visitor_message() {
        let h = harness();
        h.store.add_staff("Support", UserRole::Admin).await;
        h.store
            .set_settings(Settings {
                enable_auto_response: true,
                auto_response_message: Some("Thanks for reaching out".into()),
                ..Default::default()
            })
            .await;
        let (_, chat) = h.store.add_visitor_chat("Ada").await;
        let (conn, mut rx) = connect(&h.hub, None).await;
        h.hub.join_chat(&conn, chat.id).await;

        h.relay
            .send_message(&conn, visitor_send(chat.id, "hello"))
            .await
            .unwrap();
        assert!(h.relay.auto_responder().is_pending(&chat.id).await);
        drain(&mut rx);

        tokio::time::sleep(Duration::from_millis(1_100)).await;

        let messages = h.store.list_messages(chat.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_bot);
        assert_eq!(messages[1].content, "Thanks for reaching out");

        match drain(&mut rx).as_slice() {
            [ServerEvent::ReceiveMessage { message, .. }] => assert!(message.is_bot),
            other => panic!("unexpected events {other:?}"),
        }
    }

    /// Delegates to the in-memory store but cannot read settings
    struct SettingsOutage(Arc<InMemoryChatStore>);

    #[async_trait::async_trait]
    impl ChatStore for SettingsOutage {
        async fn create_user(&self, user: &User) -> StoreResult<()> {
            self.0.create_user(user).await
        }
        async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
            self.0.find_user(id).await
        }
        async fn find_any_admin(&self) -> StoreResult<Option<User>> {
            self.0.find_any_admin().await
        }
        async fn rename_user(&self, id: Uuid, name: &str) -> StoreResult<bool> {
            self.0.rename_user(id, name).await
        }
        async fn create_chat(&self, chat: &ChatSession) -> StoreResult<()> {
            self.0.create_chat(chat).await
        }
        async fn find_chat(&self, id: Uuid) -> StoreResult<Option<ChatSession>> {
            self.0.find_chat(id).await
        }
        async fn activate_chat(&self, id: Uuid) -> StoreResult<Option<ChatSession>> {
            self.0.activate_chat(id).await
        }
        async fn close_chat(&self, id: Uuid) -> StoreResult<Option<ChatSession>> {
            self.0.close_chat(id).await
        }
        async fn rate_chat(&self, id: Uuid, rating: i32) -> StoreResult<bool> {
            self.0.rate_chat(id, rating).await
        }
        async fn create_message(&self, message: NewMessage) -> StoreResult<Message> {
            self.0.create_message(message).await
        }
        async fn count_bot_messages(&self, chat_id: Uuid) -> StoreResult<i64> {
            self.0.count_bot_messages(chat_id).await
        }
        async fn list_messages(&self, chat_id: Uuid) -> StoreResult<Vec<Message>> {
            self.0.list_messages(chat_id).await
        }
        async fn settings(&self) -> StoreResult<Settings> {
            Err(StoreError::Unavailable("settings".into()))
        }
    }

    #[tokio::test]
    async fn test_settings_outage_still_delivers_message() {
        let inner = Arc::new(InMemoryChatStore::new());
        let store: Arc<dyn ChatStore> = Arc::new(SettingsOutage(inner.clone()));
        let hub = RelayHub::new();
        let responder =
            AutoResponder::new(store.clone(), hub.clone(), Duration::from_millis(1_000));
        let relay = MessageRelay::new(store, hub.clone(), responder, false);

        let (_, chat) = inner.add_visitor_chat("Ada").await;
        let (conn, mut rx) = connect(&hub, None).await;
        hub.join_chat(&conn, chat.id).await;

        relay.handle_send(&conn, visitor_send(chat.id, "hello")).await;

        match drain(&mut rx).as_slice() {
            [
                ServerEvent::ReceiveMessage { message, .. },
                ServerEvent::MessageSent { message_id, .. },
            ] => {
                assert_eq!(message.content, "hello");
                assert_eq!(*message_id, message.id);
            }
            other => panic!("unexpected events {other:?}"),
        }
        assert_eq!(inner.list_messages(chat.id).await.unwrap().len(), 1);
        assert!(!relay.auto_responder().is_pending(&chat.id).await);
    }

    #[test]
    fn test_error_events() {
        let chat_id = Uuid::new_v4();
        let event = RelayError::from(PolicyViolation::ChatClosed {
            chat_id,
            reason: CHAT_CLOSED_REASON.into(),
        })
        .to_event();
        assert!(matches!(event, ServerEvent::ChatClosed { chat_id: id, .. } if id == chat_id));

        let event = RelayError::Store(StoreError::Unavailable("down".into())).to_event();
        match event {
            ServerEvent::ChatError { message, detail } => {
                assert_eq!(message, SEND_FAILED);
                assert_eq!(detail.as_deref(), Some("Store unavailable: down"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
