//! Chat widget core: conversation state, webhook gateway, and transcripts,
//! shared by the CLI front-end and any embedding host.

pub mod clipboard;
pub mod config;
pub mod conversation;
pub mod echo;
pub mod init;
pub mod message;
pub mod transcript;
pub mod webhook;
pub mod widget;
