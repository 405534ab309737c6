//! Conversation state and the send operation.
//!
//! A [`ConversationController`] owns one conversation: the message log, the
//! in-flight flag and the last error. Clones share the same state, so a clone
//! can be handed to a spawned task while the UI keeps reading snapshots or
//! watching [`ConversationController::subscribe`].

use crate::ai::{ChatResult, ReplyMode, ReplyStrategy};
use crate::config::Config;
use crate::types::{ConversationState, Message};
use std::sync::Arc;
use tokio::sync::watch;

pub const BUSY_ERROR: &str = "A message is already being sent";

/// What to do when `send_message` is called while another send is pending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SendPolicy {
    /// Let sends overlap. Replies land in completion order and the last
    /// finisher decides `is_loading` and `error`.
    #[default]
    Concurrent,
    /// Reject the new send and report [`BUSY_ERROR`].
    SingleFlight,
}

#[derive(Clone)]
pub struct ConversationController {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<ConversationState>,
    strategy: Arc<dyn ReplyStrategy>,
    policy: SendPolicy,
}

impl ConversationController {
    pub fn new(strategy: Arc<dyn ReplyStrategy>) -> Self {
        Self::with_policy(strategy, SendPolicy::default())
    }

    pub fn with_policy(strategy: Arc<dyn ReplyStrategy>, policy: SendPolicy) -> Self {
        let (state, _) = watch::channel(ConversationState::default());
        Self {
            inner: Arc::new(Inner {
                state,
                strategy,
                policy,
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_policy(config.strategy(), config.send_policy)
    }

    pub fn mode(&self) -> ReplyMode {
        self.inner.strategy.mode()
    }

    pub fn policy(&self) -> SendPolicy {
        self.inner.policy
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.borrow().messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    pub fn snapshot(&self) -> ConversationState {
        self.inner.state.borrow().clone()
    }

    /// Receives the full state after every change.
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.inner.state.subscribe()
    }

    /// Appends `text` as a user message, then the assistant's reply.
    ///
    /// The user message is in the log before the first await. Failures never
    /// escape: they end up in [`error`](Self::error) and the log, and the user
    /// message stays. `is_loading` is false again once this returns, or once
    /// the future is dropped before finishing.
    pub async fn send_message(&self, text: impl Into<String>) {
        let text = text.into();
        if !self.begin_send(&text) {
            return;
        }

        let guard = LoadingGuard::new(&self.inner.state);
        let result = self.inner.strategy.reply(&text).await;
        guard.disarm();
        self.finish_send(result);
    }

    fn begin_send(&self, text: &str) -> bool {
        let single_flight = self.inner.policy == SendPolicy::SingleFlight;
        let mut accepted = true;

        self.inner.state.send_modify(|state| {
            if single_flight && state.is_loading {
                state.error = Some(BUSY_ERROR.to_string());
                accepted = false;
                return;
            }
            state.error = None;
            state.is_loading = true;
            state.messages.push(Message::user(text));
        });

        if !accepted {
            tracing::warn!("send rejected while another message is pending");
        }
        accepted
    }

    fn finish_send(&self, result: ChatResult<String>) {
        let mode = self.mode();
        self.inner.state.send_modify(|state| {
            match &result {
                Ok(reply) => {
                    state.messages.push(Message::assistant(reply.as_str()));
                    // A rejection is stale once the send it collided with is done.
                    if state.error.as_deref() == Some(BUSY_ERROR) {
                        state.error = None;
                    }
                }
                Err(err) => state.error = Some(err.display_message().to_string()),
            }
            state.is_loading = false;
        });

        match result {
            Ok(_) => tracing::debug!(%mode, "assistant replied"),
            Err(err) => tracing::error!(%mode, error = %err, "AI assistant error"),
        }
    }
}

/// Clears `is_loading` if a send is abandoned mid-flight (dropped or unwinding).
struct LoadingGuard<'a> {
    state: Option<&'a watch::Sender<ConversationState>>,
}

impl<'a> LoadingGuard<'a> {
    fn new(state: &'a watch::Sender<ConversationState>) -> Self {
        Self { state: Some(state) }
    }

    fn disarm(mut self) {
        self.state = None;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            tracing::debug!("send abandoned before a reply arrived");
            state.send_modify(|s| s.is_loading = false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{CANNED_REPLY, ChatError, SimulatedReplies};
    use crate::types::Sender;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Hands out the queued results in order.
    struct ScriptedReplies(Mutex<Vec<ChatResult<String>>>);

    impl ScriptedReplies {
        fn new(results: Vec<ChatResult<String>>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(results)))
        }
    }

    #[async_trait]
    impl ReplyStrategy for ScriptedReplies {
        async fn reply(&self, _text: &str) -> ChatResult<String> {
            self.0.lock().unwrap().remove(0)
        }

        fn mode(&self) -> ReplyMode {
            ReplyMode::Live
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_message_appended_before_first_await() {
        let controller = ConversationController::new(Arc::new(SimulatedReplies::new()));
        let send = controller.send_message("hi");
        tokio::pin!(send);

        assert!(futures::poll!(&mut send).is_pending());
        let state = controller.snapshot();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].sender, Sender::User);
        assert!(state.is_loading);

        send.await;
        assert!(!controller.is_loading());
        assert_eq!(controller.messages()[1].text, CANNED_REPLY);
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let controller = ConversationController::new(ScriptedReplies::new(vec![
            Err(ChatError::new("boom")),
            Ok("ok".into()),
        ]));

        controller.send_message("a").await;
        assert_eq!(controller.error().as_deref(), Some("boom"));

        controller.send_message("b").await;
        assert_eq!(controller.error(), None);
        assert_eq!(controller.messages().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_send_clears_loading() {
        let controller = ConversationController::new(Arc::new(SimulatedReplies::new()));

        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), controller.send_message("hi")).await;

        assert!(timed_out.is_err());
        assert!(!controller.is_loading());
        assert_eq!(controller.messages().len(), 1);
        assert_eq!(controller.error(), None);
    }

    #[tokio::test]
    async fn test_panicking_strategy_clears_loading() {
        struct Exploding;

        #[async_trait]
        impl ReplyStrategy for Exploding {
            async fn reply(&self, _text: &str) -> ChatResult<String> {
                panic!("strategy blew up");
            }

            fn mode(&self) -> ReplyMode {
                ReplyMode::Live
            }
        }

        let controller = ConversationController::new(Arc::new(Exploding));
        let background = controller.clone();
        let joined = tokio::spawn(async move { background.send_message("hi").await }).await;

        assert!(joined.unwrap_err().is_panic());
        assert!(!controller.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_rejects_overlapping_send() {
        let controller = ConversationController::with_policy(
            Arc::new(SimulatedReplies::with_delay(Duration::from_millis(500))),
            SendPolicy::SingleFlight,
        );

        let first = controller.send_message("first");
        tokio::pin!(first);
        assert!(futures::poll!(&mut first).is_pending());

        controller.send_message("second").await;
        assert_eq!(controller.error().as_deref(), Some(BUSY_ERROR));
        assert_eq!(controller.messages().len(), 1);
        assert!(controller.is_loading());

        first.await;
        let texts: Vec<String> = controller.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["first".to_string(), CANNED_REPLY.to_string()]);
        assert!(!controller.is_loading());
        assert_eq!(controller.error(), None);
    }

    #[tokio::test]
    async fn test_subscriber_sees_loading_then_idle() {
        let controller = ConversationController::new(ScriptedReplies::new(vec![Ok("pong".into())]));
        let mut rx = controller.subscribe();

        controller.send_message("ping").await;

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert!(!state.is_loading);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages.last().map(|m| m.text.as_str()), Some("pong"));
    }

    #[test]
    fn test_from_config_carries_policy() {
        let config = Config {
            mode: ReplyMode::Simulated,
            send_policy: SendPolicy::SingleFlight,
            ..Config::default()
        };
        let controller = ConversationController::from_config(&config);
        assert_eq!(controller.policy(), SendPolicy::SingleFlight);
        assert_eq!(controller.mode(), ReplyMode::Simulated);
    }
}
