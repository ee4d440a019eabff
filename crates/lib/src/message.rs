//! Chat messages shown in the widget: who sent them, when, and under which id.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Greeting placed in a fresh conversation.
pub const GREETING_TEXT: &str = "Hello! How can I help you today?";

/// Seed message left behind by a clear.
pub const CLEARED_TEXT: &str = "Chat history cleared. How can I help you today?";

/// Sentinel id of the "copied to clipboard" notice.
pub const COPY_NOTICE_ID: &str = "copy-success";

/// Opaque message identifier. Fresh ids are never reused; notice ids are fixed sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generate a new unique id (`msg-<uuid>`).
    pub fn generate() -> Self {
        Self(format!("msg-{}", uuid::Uuid::new_v4()))
    }

    /// A fixed id used for system notices that are later removed by id.
    pub fn sentinel(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

/// A single entry in the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    /// Creation time. Informational only; insertion order governs display order.
    pub timestamp: DateTime<Local>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageId::generate(), text, Sender::User)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(MessageId::generate(), text, Sender::Agent)
    }

    /// Agent-sender system notice under a fixed sentinel id.
    pub fn notice(id: &str, text: impl Into<String>) -> Self {
        Self::new(MessageId::sentinel(id), text, Sender::Agent)
    }

    fn new(id: MessageId, text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id,
            text: text.into(),
            sender,
            timestamp: Local::now(),
        }
    }
}
