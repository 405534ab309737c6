//! Reply generation for the conversation controller.
//!
//! # Architecture
//!
//! - `strategy` - `ReplyStrategy` with simulated and live implementations
//! - `transport` - `MessageTransport` and the reqwest-backed `HttpTransport`
//!
//! # Usage
//!
//! ```rust,no_run
//! use assistant_chat::ai::{HttpTransport, LiveReplies, ReplyStrategy};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), assistant_chat::ai::ChatError> {
//! let transport = HttpTransport::new("http://127.0.0.1:3000", None);
//! let live = LiveReplies::new(Arc::new(transport));
//! let reply = live.reply("Hello!").await?;
//! # Ok(())
//! # }
//! ```
mod strategy;
mod transport;

pub use strategy::{
    CANNED_REPLY, LiveReplies, ReplyMode, ReplyStrategy, SIMULATED_DELAY, SimulatedReplies,
};
pub use transport::{CHAT_PATH, ChatReply, ChatRequest, HttpTransport, MessageTransport};

/// Shown when a failure carries no message of its own.
pub const FALLBACK_ERROR: &str = "Failed to send message";

/// The single failure kind for a send: a human-readable message, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ChatError {
    message: String,
}

impl ChatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// A failure with nothing to say about itself.
    pub fn unspecified() -> Self {
        Self::new(String::new())
    }

    /// The text to surface in the `error` field.
    pub fn display_message(&self) -> &str {
        if self.message.is_empty() {
            FALLBACK_ERROR
        } else {
            &self.message
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::new(err.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::new(format!("Malformed assistant reply: {err}"))
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
