//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.chatwidget/config.json`) and environment.
//! The widget section is swapped as a whole; core logic never merges it field by field.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Widget settings (endpoint, agent name, presentation).
    #[serde(default)]
    pub widget: ChatConfig,

    /// Response pacing and notice lifetime.
    #[serde(default)]
    pub pacing: PacingConfig,
}

/// Widget settings. Only `webhook_url` and `agent_name` drive behavior; the rest is presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    /// Webhook endpoint. Absent or blank means replies are canned and nothing is sent.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Shown in the header and used as the agent's name in transcripts.
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    #[serde(default = "default_agent_avatar")]
    pub agent_avatar: String,

    /// `#RRGGBB`.
    #[serde(default = "default_primary_color")]
    pub primary_color: String,

    #[serde(default)]
    pub position: Position,
}

/// Corner of the page the widget is pinned to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacingConfig {
    /// Delay before a webhook outcome is shown (default 1000).
    #[serde(default = "default_response_delay_ms")]
    pub response_delay_ms: u64,

    /// How long the "copied" notice stays visible (default 3000).
    #[serde(default = "default_notice_ttl_ms")]
    pub notice_ttl_ms: u64,
}

fn default_agent_name() -> String {
    "Support Agent".to_string()
}

fn default_agent_avatar() -> String {
    "https://images.unsplash.com/photo-1494790108377-be9c29b29330?w=200&h=200&fit=crop".to_string()
}

fn default_primary_color() -> String {
    "#3B82F6".to_string()
}

fn default_response_delay_ms() -> u64 {
    1000
}

fn default_notice_ttl_ms() -> u64 {
    3000
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            agent_name: default_agent_name(),
            agent_avatar: default_agent_avatar(),
            primary_color: default_primary_color(),
            position: Position::default(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            response_delay_ms: default_response_delay_ms(),
            notice_ttl_ms: default_notice_ttl_ms(),
        }
    }
}

impl PacingConfig {
    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.response_delay_ms)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }
}

impl ChatConfig {
    /// Check fields that would otherwise fail late (bad endpoint scheme, malformed color).
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = self.webhook_url.as_deref().map(str::trim) {
            if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("webhookUrl must be an http(s) URL, got {:?}", url);
            }
        }
        if !is_hex_color(&self.primary_color) {
            anyhow::bail!("primaryColor must be #RRGGBB, got {:?}", self.primary_color);
        }
        Ok(())
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Resolve the webhook URL: env CHATWIDGET_WEBHOOK_URL overrides config.
pub fn resolve_webhook_url(config: &Config) -> Option<String> {
    std::env::var("CHATWIDGET_WEBHOOK_URL")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .widget
                .webhook_url
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Widget settings with environment overrides applied.
pub fn effective_widget_config(config: &Config) -> ChatConfig {
    ChatConfig {
        webhook_url: resolve_webhook_url(config),
        ..config.widget.clone()
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("CHATWIDGET_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".chatwidget").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or CHATWIDGET_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config: Config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    config
        .widget
        .validate()
        .with_context(|| format!("invalid widget config in {}", path.display()))?;
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let c: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(c, Config::default());
        assert_eq!(c.widget.agent_name, "Support Agent");
        assert_eq!(c.widget.primary_color, "#3B82F6");
        assert_eq!(c.widget.position, Position::BottomRight);
        assert_eq!(c.pacing.response_delay(), Duration::from_millis(1000));
        assert_eq!(c.pacing.notice_ttl(), Duration::from_millis(3000));
    }

    #[test]
    fn parses_camel_case_and_kebab_position() {
        let c: Config = serde_json::from_str(
            r##"{"widget":{"webhookUrl":"https://hook.example/x","agentName":"Ada","position":"top-left","primaryColor":"#10B981"},"pacing":{"responseDelayMs":0}}"##,
        )
        .unwrap();
        assert_eq!(c.widget.webhook_url.as_deref(), Some("https://hook.example/x"));
        assert_eq!(c.widget.agent_name, "Ada");
        assert_eq!(c.widget.position, Position::TopLeft);
        assert_eq!(c.pacing.response_delay_ms, 0);
        assert_eq!(c.pacing.notice_ttl_ms, 3000);
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let mut w = ChatConfig::default();
        assert!(w.validate().is_ok());
        w.webhook_url = Some("   ".into());
        assert!(w.validate().is_ok());
        w.webhook_url = Some("ftp://x".into());
        assert!(w.validate().is_err());
        w.webhook_url = None;
        w.primary_color = "blue".into();
        assert!(w.validate().is_err());
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let path = std::env::temp_dir()
            .join(format!("chatwidget-missing-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let (c, p) = load_config(Some(path.clone())).unwrap();
        assert_eq!(c, Config::default());
        assert_eq!(p, path);
    }
}
