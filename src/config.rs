//! Environment-driven configuration.
//!
//! | Variable                       | Values                        | Default                         |
//! |--------------------------------|-------------------------------|---------------------------------|
//! | `ASSISTANT_MODE`               | `simulated`, `live`           | simulated in debug, else live   |
//! | `ASSISTANT_BASE_URL`           | URL                           | `http://127.0.0.1:3000`         |
//! | `ASSISTANT_API_KEY`            | bearer token                  | none                            |
//! | `ASSISTANT_SEND_POLICY`        | `concurrent`, `single-flight` | `concurrent`                    |
//! | `ASSISTANT_SIMULATED_DELAY_MS` | milliseconds                  | `1000`                          |

use crate::ai::{
    HttpTransport, LiveReplies, ReplyMode, ReplyStrategy, SIMULATED_DELAY, SimulatedReplies,
};
use crate::conversation::SendPolicy;
use std::env;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid ASSISTANT_MODE: {0} (expected simulated or live)")]
    InvalidMode(String),

    #[error("Invalid ASSISTANT_SEND_POLICY: {0} (expected concurrent or single-flight)")]
    InvalidSendPolicy(String),

    #[error("Invalid ASSISTANT_SIMULATED_DELAY_MS: {0}")]
    InvalidDelay(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub mode: ReplyMode,
    pub base_url: String,
    pub api_key: Option<String>,
    pub send_policy: SendPolicy,
    pub simulated_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            send_policy: SendPolicy::Concurrent,
            simulated_delay: SIMULATED_DELAY,
        }
    }
}

// Debug builds stand in for the development server, which fakes replies.
fn default_mode() -> ReplyMode {
    if cfg!(debug_assertions) {
        ReplyMode::Simulated
    } else {
        ReplyMode::Live
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mode = match read("ASSISTANT_MODE") {
            Some(raw) => parse_mode(&raw)?,
            None => defaults.mode,
        };
        let send_policy = match read("ASSISTANT_SEND_POLICY") {
            Some(raw) => parse_send_policy(&raw)?,
            None => defaults.send_policy,
        };
        let simulated_delay = match read("ASSISTANT_SIMULATED_DELAY_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidDelay(raw))?,
            None => defaults.simulated_delay,
        };

        Ok(Self {
            mode,
            base_url: read("ASSISTANT_BASE_URL").unwrap_or(defaults.base_url),
            api_key: read("ASSISTANT_API_KEY"),
            send_policy,
            simulated_delay,
        })
    }

    /// The reply strategy this configuration selects.
    pub fn strategy(&self) -> Arc<dyn ReplyStrategy> {
        match self.mode {
            ReplyMode::Simulated => Arc::new(SimulatedReplies::with_delay(self.simulated_delay)),
            ReplyMode::Live => {
                let transport = HttpTransport::new(self.base_url.clone(), self.api_key.clone());
                Arc::new(LiveReplies::new(Arc::new(transport)))
            }
        }
    }
}

fn parse_mode(raw: &str) -> Result<ReplyMode, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "simulated" | "dev" | "development" => Ok(ReplyMode::Simulated),
        "live" | "prod" | "production" => Ok(ReplyMode::Live),
        _ => Err(ConfigError::InvalidMode(raw.to_string())),
    }
}

fn parse_send_policy(raw: &str) -> Result<SendPolicy, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "concurrent" => Ok(SendPolicy::Concurrent),
        "single-flight" | "single_flight" => Ok(SendPolicy::SingleFlight),
        _ => Err(ConfigError::InvalidSendPolicy(raw.to_string())),
    }
}
