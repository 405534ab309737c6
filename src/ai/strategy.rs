use super::transport::{CHAT_PATH, ChatRequest, MessageTransport};
use super::ChatResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const CANNED_REPLY: &str = "I'm here to help! Let me know what you need assistance with.";
pub const SIMULATED_DELAY: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyMode {
    Simulated,
    Live,
}

impl fmt::Display for ReplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyMode::Simulated => write!(f, "simulated"),
            ReplyMode::Live => write!(f, "live"),
        }
    }
}

/// Produces the assistant's reply to one user message.
#[async_trait]
pub trait ReplyStrategy: Send + Sync {
    async fn reply(&self, text: &str) -> ChatResult<String>;

    fn mode(&self) -> ReplyMode;
}

/// Fabricates a canned reply locally after a fixed delay.
#[derive(Clone, Debug)]
pub struct SimulatedReplies {
    delay: Duration,
}

impl SimulatedReplies {
    pub fn new() -> Self {
        Self {
            delay: SIMULATED_DELAY,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedReplies {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplyStrategy for SimulatedReplies {
    async fn reply(&self, _text: &str) -> ChatResult<String> {
        tokio::time::sleep(self.delay).await;
        Ok(CANNED_REPLY.to_string())
    }

    fn mode(&self) -> ReplyMode {
        ReplyMode::Simulated
    }
}

/// Asks the assistant service through a `MessageTransport`.
#[derive(Clone)]
pub struct LiveReplies {
    transport: Arc<dyn MessageTransport>,
}

impl LiveReplies {
    pub fn new(transport: Arc<dyn MessageTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ReplyStrategy for LiveReplies {
    async fn reply(&self, text: &str) -> ChatResult<String> {
        let body = ChatRequest {
            message: text.to_string(),
        };
        let reply = self.transport.post(CHAT_PATH, &body).await?;
        Ok(reply.response)
    }

    fn mode(&self) -> ReplyMode {
        ReplyMode::Live
    }
}
