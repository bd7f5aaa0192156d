//! Channels — how replies leave the bot and how messages come in.

pub mod cli;
pub mod whatsapp;

pub use cli::{CliChannel, CliTransport};
pub use whatsapp::{WhatsAppConfig, WhatsAppTransport, webhook_router};

use async_trait::async_trait;

use crate::error::ChannelError;

/// Outbound text delivery.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logging.
    fn name(&self) -> &str;

    /// Deliver `text` to `recipient`. Failures are reported, never retried here.
    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), ChannelError>;
}

/// Split `text` into chunks of at most `max_chars` characters, preferring
/// newline then space boundaries.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.chars().count() > max_chars {
        // Byte offset of the first character past the limit.
        let limit = remaining
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        let window = &remaining[..limit];
        let split_at = match window.rfind('\n').or_else(|| window.rfind(' ')) {
            Some(0) | None => limit,
            Some(i) => i,
        };
        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }
    if !remaining.is_empty() || chunks.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}
