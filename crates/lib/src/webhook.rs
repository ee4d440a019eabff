//! Webhook gateway: POSTs chat messages and transcripts to the configured endpoint.
//!
//! Every outcome (reply, missing field, HTTP error, transport error, no endpoint)
//! is normalized to a display text for the conversation; nothing is surfaced as an
//! error to the caller.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::time::Duration;

/// Delay before a message outcome is delivered, simulating the agent typing.
pub const DEFAULT_PACING: Duration = Duration::from_millis(1000);

pub const NOT_CONFIGURED_TEXT: &str = "Thanks for your message! Please configure the webhook URL in settings to enable automated responses.";
pub const NO_REPLY_TEXT: &str = "No reply key!";
pub const TRANSCRIPT_SENT_TEXT: &str = "Transcript sent successfully!";
pub const TRANSCRIPT_FAILED_TEXT: &str = "Failed to send transcript. Please try again.";
pub const TRANSCRIPT_NOT_CONFIGURED_TEXT: &str =
    "Please configure the webhook URL in settings to send transcripts.";

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}{}", reason_suffix(.reason))]
    Status { status: u16, reason: String },
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
}

/// `": <reason>"`, or nothing for statuses without a reason phrase.
fn reason_suffix(reason: &str) -> String {
    if reason.is_empty() {
        String::new()
    } else {
        format!(": {}", reason)
    }
}

/// Result of sending one chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The endpoint answered with a `reply` field.
    Reply(String),
    /// Success status but no `reply` field in the body.
    NoReplyField,
    /// Non-success status, transport failure, or unparseable body.
    Failed(String),
    /// No endpoint configured; no request was made.
    NotConfigured,
}

impl MessageOutcome {
    /// Text appended to the conversation as the agent's answer.
    pub fn text(&self) -> String {
        match self {
            MessageOutcome::Reply(r) => r.clone(),
            MessageOutcome::NoReplyField => NO_REPLY_TEXT.to_string(),
            MessageOutcome::Failed(e) => format!("Error: {}", e),
            MessageOutcome::NotConfigured => NOT_CONFIGURED_TEXT.to_string(),
        }
    }
}

/// Result of sending a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptOutcome {
    Sent,
    Failed,
    NotConfigured,
}

impl TranscriptOutcome {
    pub fn text(&self) -> &'static str {
        match self {
            TranscriptOutcome::Sent => TRANSCRIPT_SENT_TEXT,
            TranscriptOutcome::Failed => TRANSCRIPT_FAILED_TEXT,
            TranscriptOutcome::NotConfigured => TRANSCRIPT_NOT_CONFIGURED_TEXT,
        }
    }
}

/// Body for a chat message: `{ "message": ... }`.
#[derive(Debug, Serialize)]
pub struct MessagePayload<'a> {
    pub message: &'a str,
}

/// Body for a transcript: `{ "type": "transcript", "transcript", "timestamp", "sessionId" }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptPayload<'a> {
    #[serde(rename = "type")]
    pub typ: &'static str,
    pub transcript: &'a str,
    /// ISO-8601 UTC time of the send.
    pub timestamp: String,
    /// `chat-session-<epoch ms>` at call time.
    pub session_id: String,
}

impl<'a> TranscriptPayload<'a> {
    pub fn new(transcript: &'a str) -> Self {
        let now = Utc::now();
        Self {
            typ: "transcript",
            transcript,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            session_id: format!("chat-session-{}", now.timestamp_millis()),
        }
    }
}

/// Trimmed endpoint, or `None` when absent or blank.
pub fn configured_endpoint(endpoint: Option<&str>) -> Option<&str> {
    endpoint.map(str::trim).filter(|e| !e.is_empty())
}

/// Stateless HTTP exchange with the webhook endpoint.
#[derive(Clone)]
pub struct WebhookGateway {
    client: reqwest::Client,
    pacing: Duration,
}

impl Default for WebhookGateway {
    fn default() -> Self {
        Self::new(DEFAULT_PACING)
    }
}

impl WebhookGateway {
    pub fn new(pacing: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            pacing,
        }
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// POST `{ "message": text }` and map the response to an outcome, delivered after the pacing delay.
    pub async fn send_message(&self, endpoint: Option<&str>, text: &str) -> MessageOutcome {
        let outcome = match configured_endpoint(endpoint) {
            None => {
                log::debug!("webhook not configured, skipping request");
                MessageOutcome::NotConfigured
            }
            Some(url) => match self.post_message(url, text).await {
                Ok(Some(reply)) => MessageOutcome::Reply(reply),
                Ok(None) => {
                    log::debug!("webhook response had no reply field");
                    MessageOutcome::NoReplyField
                }
                Err(e) => {
                    log::warn!("webhook message send to {} failed: {}", url, e);
                    MessageOutcome::Failed(e.to_string())
                }
            },
        };
        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
        outcome
    }

    async fn post_message(&self, url: &str, text: &str) -> Result<Option<String>, WebhookError> {
        log::debug!("sending message to webhook {}", url);
        let res = self
            .client
            .post(url)
            .json(&MessagePayload { message: text })
            .send()
            .await?;
        let status = res.status();
        log::debug!("webhook response status: {}", status);
        if !status.is_success() {
            return Err(WebhookError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        let body = res.text().await?;
        let data: serde_json::Value = serde_json::from_str(&body)?;
        Ok(extract_reply(&data))
    }

    /// POST the transcript. No pacing delay; the response body is ignored beyond its status.
    pub async fn send_transcript(&self, endpoint: Option<&str>, transcript: &str) -> TranscriptOutcome {
        let Some(url) = configured_endpoint(endpoint) else {
            return TranscriptOutcome::NotConfigured;
        };
        let payload = TranscriptPayload::new(transcript);
        log::debug!("sending transcript to webhook {} ({})", url, payload.session_id);
        let res = self.client.post(url).json(&payload).send().await;
        match res {
            Ok(r) if r.status().is_success() => TranscriptOutcome::Sent,
            Ok(r) => {
                log::warn!("transcript send to {} returned {}", url, r.status());
                TranscriptOutcome::Failed
            }
            Err(e) => {
                log::warn!("transcript send to {} failed: {}", url, e);
                TranscriptOutcome::Failed
            }
        }
    }
}

/// `reply` from a response body. Null or absent is `None`; non-string values are rendered as JSON.
fn extract_reply(data: &serde_json::Value) -> Option<String> {
    match data.get("reply")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
