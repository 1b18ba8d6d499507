// src/notifier/mod.rs

pub mod telegram;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::jobs::models::RecipientId;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram api error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Outbound side of the chat transport. Every call is attempted exactly once.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, recipient: RecipientId, text: &str) -> Result<(), NotifierError>;

    async fn send_document(
        &self,
        recipient: RecipientId,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<(), NotifierError>;
}

/// Convenient type alias for dyn notifier.
pub type DynNotifier = Arc<dyn Notifier>;
