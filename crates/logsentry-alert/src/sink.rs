//! Notification sink abstraction

use async_trait::async_trait;
use logsentry_core::Alert;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("output stream unusable: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint rejected the notification ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("could not build message: {0}")]
    Message(String),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// A channel alerts are broadcast to.
/// An empty alert slice must be accepted as a successful no-op.
#[async_trait]
pub trait AlertSink: Send + Sync {
    // identifier used as the key of dispatch results
    fn name(&self) -> &str;

    async fn send(&self, alerts: &[Alert]) -> Result<(), SinkError>;
}

// first `max` chars, with "..." when cut
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
