//! Conversation state: the ordered message list and the typing indicator.
//!
//! The sequence is append-only except for `clear` (which swaps in a single seed
//! message) and removal of sentinel-id notices. Every mutation is published as a
//! [`ConversationEvent`] so a presentation layer can render incrementally.

use crate::message::{Message, MessageId, CLEARED_TEXT, GREETING_TEXT};
use tokio::sync::{broadcast, RwLock};

const EVENT_CAPACITY: usize = 64;

/// Change notification published after each mutation.
#[derive(Debug, Clone)]
pub enum ConversationEvent {
    Appended(Message),
    Removed(MessageId),
    /// The history was replaced by this single seed message.
    Cleared(Message),
    Typing(bool),
}

struct State {
    messages: Vec<Message>,
    typing: bool,
    /// Bumped on every clear; completions tagged with an older epoch are stale.
    epoch: u64,
}

pub struct Conversation {
    inner: RwLock<State>,
    events: broadcast::Sender<ConversationEvent>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// New conversation seeded with the agent greeting.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: RwLock::new(State {
                messages: vec![Message::agent(GREETING_TEXT)],
                typing: false,
                epoch: 0,
            }),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: ConversationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Append a user message. Returns `None` (and changes nothing) when the trimmed text is empty.
    pub async fn append_user_message(&self, text: &str) -> Option<Message> {
        self.append_user_message_with_epoch(text).await.map(|(m, _)| m)
    }

    /// Like `append_user_message`, also returning the epoch the message was appended under.
    pub async fn append_user_message_with_epoch(&self, text: &str) -> Option<(Message, u64)> {
        if text.trim().is_empty() {
            return None;
        }
        let msg = Message::user(text);
        let epoch = {
            let mut g = self.inner.write().await;
            g.messages.push(msg.clone());
            g.epoch
        };
        self.publish(ConversationEvent::Appended(msg.clone()));
        Some((msg, epoch))
    }

    /// Append an agent message. Always succeeds; identical texts are not deduplicated.
    pub async fn append_agent_message(&self, text: &str) -> Message {
        let msg = Message::agent(text);
        self.inner.write().await.messages.push(msg.clone());
        self.publish(ConversationEvent::Appended(msg.clone()));
        msg
    }

    /// Append an agent message only if no clear happened since `epoch` was read.
    pub async fn append_agent_message_in_epoch(&self, epoch: u64, text: &str) -> Option<Message> {
        let msg = {
            let mut g = self.inner.write().await;
            if g.epoch != epoch {
                return None;
            }
            let msg = Message::agent(text);
            g.messages.push(msg.clone());
            msg
        };
        self.publish(ConversationEvent::Appended(msg.clone()));
        Some(msg)
    }

    /// Append a notice under a fixed sentinel id.
    pub async fn push_notice(&self, id: &str, text: &str) -> Message {
        let msg = Message::notice(id, text);
        self.inner.write().await.messages.push(msg.clone());
        self.publish(ConversationEvent::Appended(msg.clone()));
        msg
    }

    /// Remove every message whose id equals `id`. Returns how many were removed.
    pub async fn remove_by_id(&self, id: &str) -> usize {
        let removed = {
            let mut g = self.inner.write().await;
            let before = g.messages.len();
            g.messages.retain(|m| m.id.as_str() != id);
            before - g.messages.len()
        };
        if removed > 0 {
            self.publish(ConversationEvent::Removed(MessageId::sentinel(id)));
        }
        removed
    }

    /// Replace the history with a single "cleared" agent message. Irreversible.
    pub async fn clear(&self) -> Message {
        let seed = Message::agent(CLEARED_TEXT);
        {
            let mut g = self.inner.write().await;
            g.messages = vec![seed.clone()];
            g.epoch += 1;
        }
        self.publish(ConversationEvent::Cleared(seed.clone()));
        seed
    }

    pub async fn set_typing(&self, typing: bool) {
        let changed = {
            let mut g = self.inner.write().await;
            let changed = g.typing != typing;
            g.typing = typing;
            changed
        };
        if changed {
            self.publish(ConversationEvent::Typing(typing));
        }
    }

    pub async fn is_typing(&self) -> bool {
        self.inner.read().await.typing
    }

    pub async fn epoch(&self) -> u64 {
        self.inner.read().await.epoch
    }

    /// Snapshot of the messages in display order.
    pub async fn messages(&self) -> Vec<Message> {
        self.inner.read().await.messages.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.messages.is_empty()
    }
}
