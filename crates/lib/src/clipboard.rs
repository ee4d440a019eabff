//! Clipboard sinks for transcript copy.
//! The system clipboard is reached through allowlisted helper binaries; no shell is used.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("no clipboard helper found (tried {0})")]
    Unavailable(String),
    #[error("clipboard helper {binary} failed: {reason}")]
    Helper { binary: String, reason: String },
    #[error("clipboard task failed: {0}")]
    Task(String),
}

/// Destination for copied text. Writes may block; async callers run them off the runtime.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Helper binaries tried in order, each with its fixed arguments.
const HELPERS: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("pbcopy", &[]),
    ("clip", &[]),
];

/// Writes to the OS clipboard by piping into the first helper that can be spawned.
#[derive(Debug, Clone)]
pub struct SystemClipboard {
    helpers: Vec<(String, Vec<String>)>,
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::with_helpers(
            HELPERS
                .iter()
                .map(|(b, args)| (b.to_string(), args.iter().map(|a| a.to_string()).collect()))
                .collect(),
        )
    }
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use these helpers (binary, fixed args) instead of the platform defaults.
    pub fn with_helpers(helpers: Vec<(String, Vec<String>)>) -> Self {
        Self { helpers }
    }
}

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        for (binary, args) in &self.helpers {
            // wl-copy and xclip leave a background process serving the selection;
            // it must not inherit a pipe we wait on.
            let child = Command::new(binary)
                .args(args)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
            let mut child = match child {
                Ok(c) => c,
                Err(e) => {
                    log::debug!("clipboard helper {} unavailable: {}", binary, e);
                    continue;
                }
            };
            let helper_err = |reason: String| ClipboardError::Helper {
                binary: binary.clone(),
                reason,
            };
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(text.as_bytes())
                    .map_err(|e| helper_err(e.to_string()))?;
            }
            let status = child.wait().map_err(|e| helper_err(e.to_string()))?;
            if status.success() {
                return Ok(());
            }
            return Err(helper_err(format!("exit {}", status)));
        }
        let tried: Vec<&str> = self.helpers.iter().map(|(b, _)| b.as_str()).collect();
        Err(ClipboardError::Unavailable(tried.join(", ")))
    }
}

/// In-process clipboard; keeps the last written text.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|g| g.clone())
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if let Ok(mut g) = self.contents.lock() {
            *g = Some(text.to_string());
        }
        Ok(())
    }
}
