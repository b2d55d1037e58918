//! Delayed automatic first reply
//!
//! After a visitor's first message the relay asks the [`AutoResponder`] to post
//! the configured template on behalf of an administrator. Each chat has at most
//! one pending reply; closing or deleting the chat cancels it.
//!
//! Delivery runs under the pending-map lock, so a cancel either removes the
//! reply before it is written or waits until it has been broadcast.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use livechat_shared::{Message, NewMessage};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use uuid::Uuid;

use super::events::{ChatMessageEvent, ServerEvent};
use super::state::RelayHub;
use crate::store::{ChatStore, StoreResult};

struct PendingReply {
    generation: u64,
    handle: AbortHandle,
}

/// Schedules and cancels automatic replies
#[derive(Clone)]
pub struct AutoResponder {
    store: Arc<dyn ChatStore>,
    hub: RelayHub,
    delay: Duration,
    pending: Arc<Mutex<HashMap<Uuid, PendingReply>>>,
    generation: Arc<AtomicU64>,
}

impl AutoResponder {
    pub fn new(store: Arc<dyn ChatStore>, hub: RelayHub, delay: Duration) -> Self {
        Self {
            store,
            hub,
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedule the reply for a chat
    ///
    /// Returns false when a reply is already pending for the chat.
    pub async fn schedule(&self, chat_id: Uuid, template: String) -> bool {
        let mut pending = self.pending.lock().await;
        if pending.contains_key(&chat_id) {
            tracing::debug!(chat_id = %chat_id, "Auto-response already pending");
            return false;
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let responder = self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(responder.delay).await;
            responder.fire(chat_id, generation, template).await;
        });

        pending.insert(
            chat_id,
            PendingReply {
                generation,
                handle: task.abort_handle(),
            },
        );

        tracing::info!(
            chat_id = %chat_id,
            delay_ms = self.delay.as_millis() as u64,
            "Auto-response scheduled"
        );
        true
    }

    /// Cancel the pending reply for a chat, if any
    pub async fn cancel(&self, chat_id: Uuid) -> bool {
        match self.pending.lock().await.remove(&chat_id) {
            Some(reply) => {
                reply.handle.abort();
                tracing::info!(chat_id = %chat_id, "Auto-response cancelled");
                true
            }
            None => false,
        }
    }

    pub async fn is_pending(&self, chat_id: &Uuid) -> bool {
        self.pending.lock().await.contains_key(chat_id)
    }

    async fn fire(&self, chat_id: Uuid, generation: u64, template: String) {
        let mut pending = self.pending.lock().await;
        if !pending
            .get(&chat_id)
            .is_some_and(|reply| reply.generation == generation)
        {
            return;
        }
        pending.remove(&chat_id);

        match self.deliver(chat_id, template).await {
            Ok(Some(message)) => {
                tracing::info!(
                    chat_id = %chat_id,
                    message_id = %message.id,
                    "Auto-response sent"
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(chat_id = %chat_id, error = ?e, "Failed to send auto-response");
            }
        }
    }

    /// Persist and broadcast the reply unless the chat no longer qualifies
    async fn deliver(&self, chat_id: Uuid, template: String) -> StoreResult<Option<Message>> {
        let Some(chat) = self.store.find_chat(chat_id).await? else {
            tracing::debug!(chat_id = %chat_id, "Chat gone before auto-response fired");
            return Ok(None);
        };
        if !chat.is_writable() {
            tracing::debug!(chat_id = %chat_id, "Chat closed before auto-response fired");
            return Ok(None);
        }

        if self.store.count_bot_messages(chat_id).await? > 0 {
            tracing::debug!(chat_id = %chat_id, "Chat already has a bot reply");
            return Ok(None);
        }

        let Some(admin) = self.store.find_any_admin().await? else {
            tracing::warn!(chat_id = %chat_id, "No admin user to author auto-response");
            return Ok(None);
        };

        let message = self
            .store
            .create_message(NewMessage {
                chat_id,
                user_id: admin.id,
                content: template,
                is_bot: true,
            })
            .await?;

        self.hub
            .broadcast(
                chat_id,
                ServerEvent::ReceiveMessage {
                    chat_id,
                    message: ChatMessageEvent::new(&message, &admin),
                },
            )
            .await;

        Ok(Some(message))
    }
}
