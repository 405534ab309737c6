use anyhow::Result;
use assistant_chat::types::{ConversationState, Message, Sender};
use assistant_chat::{Config, ConversationController};
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinSet;

const MESSAGE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour repr:12 padding:zero]:[minute padding:zero] [period case:upper]");

const HELP: &str = "Type a message and press enter. Commands: /json, /help, /quit";

fn load_dotenv() {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        tracing::warn!(error = %err, "failed to read .env");
    }
}

fn format_message_timestamp(timestamp: OffsetDateTime) -> String {
    let mut datetime = timestamp;
    if let Ok(offset) = UtcOffset::current_local_offset() {
        datetime = datetime.to_offset(offset);
    }
    datetime
        .format(MESSAGE_TIME_FORMAT)
        .unwrap_or_else(|_| timestamp.to_string())
}

fn render_message(msg: &Message) -> String {
    let who = match msg.sender {
        Sender::User => "you",
        Sender::Assistant => "assistant",
    };
    format!("[{}] {who}: {}", format_message_timestamp(msg.timestamp), msg.text)
}

/// Prints whatever changed since the last state it saw.
async fn print_updates(mut rx: watch::Receiver<ConversationState>) {
    let mut printed = 0;
    let mut was_loading = false;
    let mut last_error: Option<String> = None;

    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();

        // The user's own lines are already on screen.
        for msg in state.messages.iter().skip(printed) {
            if msg.sender == Sender::Assistant {
                println!("{}", render_message(msg));
            }
        }
        printed = state.messages.len();

        if state.is_loading && !was_loading {
            println!("(assistant is typing...)");
        }
        was_loading = state.is_loading;

        if state.error != last_error {
            if let Some(err) = &state.error {
                println!("error: {err}");
            }
            last_error = state.error.clone();
        }
    }
}

/// Collects sends that have already completed so the set only holds live ones.
fn reap_finished(pending: &mut JoinSet<()>) -> Result<usize> {
    let mut reaped = 0;
    while let Some(done) = pending.try_join_next() {
        done?;
        reaped += 1;
    }
    Ok(reaped)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    load_dotenv();

    let config = Config::from_env()?;
    let controller = ConversationController::from_config(&config);
    tracing::info!(mode = %config.mode, policy = ?config.send_policy, "conversation started");
    println!("{HELP}");

    let printer = tokio::spawn(print_updates(controller.subscribe()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        let command = line.trim().to_string();
        match command.as_str() {
            "/quit" | "/exit" => break,
            "/help" => println!("{HELP}"),
            "/json" => println!("{}", serde_json::to_string_pretty(&controller.messages())?),
            _ => {
                let sender = controller.clone();
                pending.spawn(async move { sender.send_message(line).await });
            }
        }
        reap_finished(&mut pending)?;
    }

    while let Some(done) = pending.join_next().await {
        done?;
    }
    drop(controller);
    printer.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_reap_finished_keeps_only_pending_sends() {
        let mut pending = JoinSet::new();
        pending.spawn(async {});
        pending.spawn(async { tokio::time::sleep(Duration::from_secs(60)).await });
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(reap_finished(&mut pending).unwrap(), 1);
        assert_eq!(pending.len(), 1);
        pending.abort_all();
    }
}
