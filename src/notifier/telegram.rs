// src/notifier/telegram.rs
//
// Telegram Bot API client (outbound) and the update payloads it posts to our
// webhook (inbound).

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::jobs::models::RecipientId;
use crate::notifier::{Notifier, NotifierError};

/// Inbound update as delivered to the webhook. Only `message` updates are requested.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

/// Envelope around every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    api_base: String,
    token: String,
}

impl TelegramNotifier {
    pub fn new(http: Client, api_base: &str, token: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Register `url` as the webhook for `message` updates.
    pub async fn set_webhook(&self, url: &str) -> Result<(), NotifierError> {
        let body = json!({
            "url": url,
            "allowed_updates": ["message"],
        });

        let response = self
            .http
            .post(self.method_url("setWebhook"))
            .json(&body)
            .send()
            .await?;

        check_response(response.json().await?)?;
        info!("Registered Telegram webhook at {}", url);
        Ok(())
    }
}

/// Turn an `ok: false` envelope into an error.
///
/// The Bot API answers failures with a JSON body and a non-2xx status, so
/// the envelope is read regardless of the HTTP status.
fn check_response(body: Value) -> Result<(), NotifierError> {
    let envelope: ApiResponse = serde_json::from_value(body)?;
    if envelope.ok {
        return Ok(());
    }

    Err(NotifierError::Api {
        code: envelope.error_code.unwrap_or_default(),
        description: envelope
            .description
            .unwrap_or_else(|| "unknown error".to_string()),
    })
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, recipient: RecipientId, text: &str) -> Result<(), NotifierError> {
        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&json!({ "chat_id": recipient, "text": text }))
            .send()
            .await?;

        check_response(response.json().await?)?;
        debug!("sendMessage to {} ok", recipient);
        Ok(())
    }

    async fn send_document(
        &self,
        recipient: RecipientId,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<(), NotifierError> {
        let file_part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)?;

        let form = multipart::Form::new()
            .text("chat_id", recipient.to_string())
            .part("document", file_part);

        let response = self
            .http
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;

        check_response(response.json().await?)?;
        debug!("sendDocument {} to {} ok", filename, recipient);
        Ok(())
    }
}
