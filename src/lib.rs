//! Client-side conversation state for a chat assistant.
//!
//! [`ConversationController`] keeps the message log, loading flag and last
//! error for one conversation and sends new user messages through a
//! [`ReplyStrategy`](ai::ReplyStrategy): either a local simulation or a live
//! `POST /api/ai/chat` call.

pub mod ai;
pub mod config;
pub mod conversation;
pub mod types;

pub use config::{Config, ConfigError};
pub use conversation::{ConversationController, SendPolicy};
pub use types::{ConversationState, Message, Sender};
