use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;

static MESSAGE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// One entry in the conversation log. Never mutated after it is appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Assistant)
    }

    fn new(text: impl Into<String>, sender: Sender) -> Self {
        let timestamp = OffsetDateTime::now_utc();
        Self {
            id: next_message_id(timestamp),
            text: text.into(),
            sender,
            timestamp,
        }
    }
}

/// `<unix millis>-<sequence>`; the sequence keeps ids distinct within a millisecond.
fn next_message_id(timestamp: OffsetDateTime) -> String {
    let seq = MESSAGE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let millis = timestamp.unix_timestamp_nanos() / 1_000_000;
    format!("{millis}-{seq}")
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub error: Option<String>,
}
