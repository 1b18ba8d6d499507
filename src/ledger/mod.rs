// src/ledger/mod.rs
//
// The shared sheet that is both inventory and ledger. Each category is one
// column; the worker is the only writer inside this process.

pub mod auth;
pub mod sheets;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::jobs::models::{Category, Record};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sheets api error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("auth error: {0}")]
    Auth(String),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(String),
}

/// Column-oriented access to the backing store.
///
/// `column` is a column letter such as `"A"`.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// All cell values of the column, top to bottom. Empty cells read as `""`.
    async fn get_column(&self, column: &str) -> Result<Vec<String>, LedgerError>;

    async fn clear_column(&self, column: &str) -> Result<(), LedgerError>;

    /// Append one value per row, in order, below the last non-empty row.
    async fn append_column(&self, column: &str, values: &[String]) -> Result<(), LedgerError>;
}

/// Convenient type alias for dyn ledger.
pub type DynLedger = Arc<dyn Ledger>;

/// Per-category view over the ledger. No caching: every call hits the store.
#[derive(Clone)]
pub struct RecordPool {
    ledger: DynLedger,
}

impl RecordPool {
    pub fn new(ledger: DynLedger) -> Self {
        Self { ledger }
    }

    /// Raw cell values currently stored for the category.
    pub async fn fetch_column(&self, category: Category) -> Result<Vec<String>, LedgerError> {
        let cells = self.ledger.get_column(category.storage_column()).await?;
        debug!(
            "Fetched {} raw cells for category {} (column {})",
            cells.len(),
            category,
            category.storage_column()
        );
        Ok(cells)
    }

    /// Replace the whole column with `remainder`: clear, then append if non-empty.
    pub async fn replace_column(
        &self,
        category: Category,
        remainder: &[Record],
    ) -> Result<(), LedgerError> {
        let column = category.storage_column();
        self.ledger.clear_column(column).await?;

        if !remainder.is_empty() {
            let values: Vec<String> = remainder.iter().map(|r| r.as_str().to_string()).collect();
            self.ledger.append_column(column, &values).await?;
        }

        debug!(
            "Rewrote column {} for category {} with {} records",
            column,
            category,
            remainder.len()
        );
        Ok(())
    }
}
