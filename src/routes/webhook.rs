// src/routes/webhook.rs
use axum::extract::State;
use tracing::{debug, error, info, warn};

use crate::jobs::{command, messages, Command, Job};
use crate::notifier::telegram::Update;
use crate::AppState;

/// POST <webhook path>
///
/// Receives Telegram updates. Commands are parsed here and queued; the
/// worker does the rest. Answers 200 without waiting on any outbound call.
pub async fn telegram_webhook(State(state): State<AppState>, body: String) -> &'static str {
    let update: Update = match serde_json::from_str(&body) {
        Ok(update) => update,
        Err(e) => {
            error!("Failed to parse webhook payload: {:?}", e);
            return "ERROR";
        }
    };

    let Some(message) = update.message else {
        debug!("Ignoring update {} without message", update.update_id);
        return "OK";
    };
    let Some(text) = message.text.as_deref() else {
        return "OK";
    };

    let chat_id = message.chat.id;

    match command::parse(text) {
        Some(Command::Start) => {
            reply(&state, chat_id, command::usage());
        }
        Some(Command::Request { category, quantity }) => {
            let Some(user) = message.from.as_ref() else {
                warn!(
                    "Ignoring request in message {} without sender (chat {})",
                    message.message_id, chat_id
                );
                return "OK";
            };

            let job = Job::new(chat_id, user.id, category, quantity);
            info!(
                "Queueing job {}: {} x{} for user {} in chat {}",
                job.id, category, quantity, user.id, chat_id
            );

            match state.queue.enqueue(job) {
                Ok(()) => reply(&state, chat_id, messages::QUEUED),
                Err(e) => {
                    error!("Failed to queue request from user {}: {}", user.id, e);
                    reply(&state, chat_id, messages::FAILED);
                }
            }
        }
        None => {}
    }

    "OK"
}

/// Send `text` from a background task; the webhook never waits on the Bot API.
fn reply(state: &AppState, chat_id: i64, text: impl Into<String>) {
    let notifier = state.notifier.clone();
    let text = text.into();

    tokio::spawn(async move {
        if let Err(e) = notifier.send_text(chat_id, &text).await {
            error!("Failed to reply in chat {}: {:?}", chat_id, e);
        }
    });
}
