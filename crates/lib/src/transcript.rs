//! Plain-text transcript of a conversation, for copy, download, and webhook send.

use crate::message::{Message, Sender};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use std::path::{Path, PathBuf};

const HEADER: &str = "Chat Transcript";
const SEPARATOR_WIDTH: usize = 50;
/// en-US style "1/2/2026, 3:04:05 PM".
const TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Render the transcript with the current time as the "generated at" line.
pub fn format(messages: &[Message], agent_name: &str) -> String {
    format_at(messages, agent_name, Local::now())
}

/// Render the transcript as of `generated_at`. Pure: same inputs give the same output.
pub fn format_at<Tz: TimeZone>(
    messages: &[Message],
    agent_name: &str,
    generated_at: DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = format!(
        "{}\n{}\n{}\n\n",
        HEADER,
        generated_at.format(TIMESTAMP_FORMAT),
        "=".repeat(SEPARATOR_WIDTH)
    );
    let body = messages
        .iter()
        .map(|m| {
            let speaker = match m.sender {
                Sender::User => "You",
                Sender::Agent => agent_name,
            };
            format!(
                "[{}] {}: {}",
                m.timestamp.format(TIMESTAMP_FORMAT),
                speaker,
                m.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push_str(&body);
    out
}

/// Download filename keyed by calendar date: `chat-transcript-YYYY-MM-DD.txt`.
pub fn download_filename(date: NaiveDate) -> String {
    format!("chat-transcript-{}.txt", date.format("%Y-%m-%d"))
}

/// Write `transcript` as UTF-8 into `dir` under today's (UTC) download filename. Returns the file path.
pub fn write_download(dir: &Path, transcript: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating download directory {}", dir.display()))?;
    let path = dir.join(download_filename(Utc::now().date_naive()));
    std::fs::write(&path, transcript)
        .with_context(|| format!("writing transcript to {}", path.display()))?;
    log::info!("wrote transcript to {}", path.display());
    Ok(path)
}
