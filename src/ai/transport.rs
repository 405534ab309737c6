use super::{ChatError, ChatResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub const CHAT_PATH: &str = "/api/ai/chat";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

/// Sends a chat request somewhere and hands back the reply.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn post(&self, path: &str, body: &ChatRequest) -> ChatResult<ChatReply>;
}

/// `MessageTransport` over HTTP, posting JSON to `{base_url}{path}`.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

fn parse_reply(status: StatusCode, body: &str) -> ChatResult<ChatReply> {
    if !status.is_success() {
        return Err(ChatError::new(format!(
            "Assistant endpoint error {status}: {body}"
        )));
    }
    Ok(serde_json::from_str::<ChatReply>(body)?)
}

#[async_trait]
impl MessageTransport for HttpTransport {
    async fn post(&self, path: &str, body: &ChatRequest) -> ChatResult<ChatReply> {
        let url = self.url_for(path);
        tracing::debug!(%url, "posting chat message");

        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        parse_reply(status, &text)
    }
}
