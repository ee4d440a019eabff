//! Chat widget controller: wires the conversation, webhook gateway, and transcript
//! together behind command methods that a presentation layer calls.
//!
//! Webhook completions that arrive after a `clear` are dropped. A second copy
//! notice replaces the first and restarts its removal timer.

use crate::clipboard::{Clipboard, ClipboardError};
use crate::config::{ChatConfig, PacingConfig};
use crate::conversation::Conversation;
use crate::message::{Message, COPY_NOTICE_ID};
use crate::transcript;
use crate::webhook::{TranscriptOutcome, WebhookGateway};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

pub const COPY_NOTICE_TEXT: &str = "Transcript copied to clipboard!";

/// Control signals from the embedding page.
#[derive(Debug, Clone)]
pub enum WidgetControl {
    /// Replace the configuration (the embed `init` call).
    Init(ChatConfig),
    Open,
    Close,
}

/// Timing knobs; zero durations make tests run without waiting.
#[derive(Debug, Clone, Copy)]
pub struct WidgetOptions {
    /// Delay before each webhook outcome is appended.
    pub pacing: Duration,
    /// Lifetime of the "copied" notice.
    pub notice_ttl: Duration,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        (&PacingConfig::default()).into()
    }
}

impl From<&PacingConfig> for WidgetOptions {
    fn from(p: &PacingConfig) -> Self {
        Self {
            pacing: p.response_delay(),
            notice_ttl: p.notice_ttl(),
        }
    }
}

struct Inner {
    conversation: Conversation,
    gateway: WebhookGateway,
    config: RwLock<ChatConfig>,
    open: AtomicBool,
    /// In-flight sends; typing stays on while nonzero.
    pending: Mutex<usize>,
    /// Identifies the newest copy notice so older timers leave it alone.
    notice_generation: AtomicU64,
    notice_ttl: Duration,
}

/// Cheap to clone; clones share one conversation.
#[derive(Clone)]
pub struct ChatWidget {
    inner: Arc<Inner>,
}

impl ChatWidget {
    pub fn new(config: ChatConfig, options: WidgetOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                conversation: Conversation::new(),
                gateway: WebhookGateway::new(options.pacing),
                config: RwLock::new(config),
                open: AtomicBool::new(false),
                pending: Mutex::new(0),
                notice_generation: AtomicU64::new(0),
                notice_ttl: options.notice_ttl,
            }),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.inner.conversation
    }

    pub async fn config(&self) -> ChatConfig {
        self.inner.config.read().await.clone()
    }

    /// Swap the whole configuration. Sends already in flight keep the endpoint they started with.
    pub async fn update_config(&self, config: ChatConfig) {
        log::debug!(
            "widget config replaced (webhook {})",
            if config.webhook_url.is_some() { "set" } else { "unset" }
        );
        *self.inner.config.write().await = config;
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    pub async fn apply(&self, control: WidgetControl) {
        match control {
            WidgetControl::Init(config) => self.update_config(config).await,
            WidgetControl::Open => self.inner.open.store(true, Ordering::SeqCst),
            WidgetControl::Close => self.inner.open.store(false, Ordering::SeqCst),
        }
    }

    /// Apply control signals from `rx` until the sender side is dropped.
    pub fn spawn_control_listener(&self, mut rx: mpsc::Receiver<WidgetControl>) -> JoinHandle<()> {
        let widget = self.clone();
        tokio::spawn(async move {
            while let Some(control) = rx.recv().await {
                log::debug!("widget control: {:?}", control);
                widget.apply(control).await;
            }
        })
    }

    /// Append the user's message and start the webhook exchange.
    /// Returns `None` for blank input (nothing appended, nothing sent); otherwise the
    /// handle of the task that appends the agent's answer.
    pub async fn send(&self, text: &str) -> Option<JoinHandle<()>> {
        let conversation = &self.inner.conversation;
        let (_, epoch) = conversation.append_user_message_with_epoch(text).await?;
        let endpoint = self.inner.config.read().await.webhook_url.clone();
        self.begin_pending().await;

        let widget = self.clone();
        let text = text.to_string();
        Some(tokio::spawn(async move {
            let outcome = widget
                .inner
                .gateway
                .send_message(endpoint.as_deref(), &text)
                .await;
            let appended = widget
                .inner
                .conversation
                .append_agent_message_in_epoch(epoch, &outcome.text())
                .await;
            if appended.is_none() {
                log::debug!("dropping webhook outcome from before the last clear");
            }
            widget.end_pending().await;
        }))
    }

    async fn begin_pending(&self) {
        let mut n = self.inner.pending.lock().await;
        *n += 1;
        self.inner.conversation.set_typing(true).await;
    }

    async fn end_pending(&self) {
        let mut n = self.inner.pending.lock().await;
        *n = n.saturating_sub(1);
        if *n == 0 {
            self.inner.conversation.set_typing(false).await;
        }
    }

    pub async fn clear(&self) -> Message {
        self.inner.conversation.clear().await
    }

    /// Current transcript text.
    pub async fn transcript(&self) -> String {
        let messages = self.inner.conversation.messages().await;
        let agent_name = self.inner.config.read().await.agent_name.clone();
        transcript::format(&messages, &agent_name)
    }

    /// Copy the transcript and show a short-lived notice. The returned handle
    /// completes once the notice's removal timer has fired.
    pub async fn copy_transcript(
        &self,
        clipboard: Arc<dyn Clipboard>,
    ) -> Result<JoinHandle<()>, ClipboardError> {
        let text = self.transcript().await;
        tokio::task::spawn_blocking(move || clipboard.write_text(&text))
            .await
            .map_err(|e| ClipboardError::Task(e.to_string()))??;

        let conversation = &self.inner.conversation;
        conversation.remove_by_id(COPY_NOTICE_ID).await;
        conversation.push_notice(COPY_NOTICE_ID, COPY_NOTICE_TEXT).await;
        let generation = self.inner.notice_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let widget = self.clone();
        Ok(tokio::spawn(async move {
            tokio::time::sleep(widget.inner.notice_ttl).await;
            if widget.inner.notice_generation.load(Ordering::SeqCst) == generation {
                widget.inner.conversation.remove_by_id(COPY_NOTICE_ID).await;
            }
        }))
    }

    /// Write the transcript to `dir` as `chat-transcript-<date>.txt`.
    pub async fn download_transcript(&self, dir: &Path) -> Result<PathBuf> {
        let text = self.transcript().await;
        transcript::write_download(dir, &text)
    }

    /// Send the transcript to the webhook and append the resulting notice.
    pub async fn send_transcript(&self) -> TranscriptOutcome {
        let endpoint = self.inner.config.read().await.webhook_url.clone();
        let outcome = match crate::webhook::configured_endpoint(endpoint.as_deref()) {
            None => TranscriptOutcome::NotConfigured,
            Some(url) => {
                let text = self.transcript().await;
                self.inner.gateway.send_transcript(Some(url), &text).await
            }
        };
        self.inner
            .conversation
            .append_agent_message(outcome.text())
            .await;
        outcome
    }
}
