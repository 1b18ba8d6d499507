// src/testing.rs
//
// In-memory fakes for the ledger and the chat transport, shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use crate::jobs::models::RecipientId;
use crate::ledger::{Ledger, LedgerError};
use crate::notifier::{Notifier, NotifierError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Get(String),
    Clear(String),
    /// Column and number of appended rows.
    Append(String, usize),
}

#[derive(Default)]
struct LedgerState {
    columns: HashMap<String, Vec<String>>,
    calls: Vec<LedgerCall>,
    fail_reads: bool,
    fail_writes: bool,
}

/// Sheet stand-in: one `Vec<String>` per column letter.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, column: &str, cells: &[&str]) {
        self.seed_owned(column, cells.iter().map(|c| c.to_string()).collect());
    }

    pub fn seed_owned(&self, column: &str, cells: Vec<String>) {
        self.state
            .lock()
            .unwrap()
            .columns
            .insert(column.to_string(), cells);
    }

    pub fn column(&self, column: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .columns
            .get(column)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }
}

fn unavailable() -> LedgerError {
    LedgerError::Api {
        status: 503,
        body: "unavailable".to_string(),
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn get_column(&self, column: &str) -> Result<Vec<String>, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(LedgerCall::Get(column.to_string()));
        if state.fail_reads {
            return Err(unavailable());
        }
        Ok(state.columns.get(column).cloned().unwrap_or_default())
    }

    async fn clear_column(&self, column: &str) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(LedgerCall::Clear(column.to_string()));
        if state.fail_writes {
            return Err(unavailable());
        }
        state.columns.remove(column);
        Ok(())
    }

    async fn append_column(&self, column: &str, values: &[String]) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(LedgerCall::Append(column.to_string(), values.len()));
        if state.fail_writes {
            return Err(unavailable());
        }
        state
            .columns
            .entry(column.to_string())
            .or_default()
            .extend(values.iter().cloned());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Text(RecipientId, String),
    /// Recipient and filename.
    Document(RecipientId, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDocument {
    pub recipient: RecipientId,
    pub filename: String,
    pub content_type: String,
    pub body: String,
    /// Tokio clock at upload time; deterministic under a paused clock.
    pub sent_at: Instant,
}

#[derive(Default)]
struct NotifierState {
    events: Vec<Event>,
    documents: Vec<SentDocument>,
    blocked: HashSet<RecipientId>,
    documents_before_failure: Option<usize>,
}

/// Records every successful send. Blocked recipients behave like users who
/// never started the bot.
#[derive(Default)]
pub struct RecordingNotifier {
    state: Mutex<NotifierState>,
    text_delay: Duration,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `send_text` sleeps for `delay` before it is recorded, like a slow Bot API.
    pub fn with_text_delay(delay: Duration) -> Self {
        Self {
            text_delay: delay,
            ..Self::default()
        }
    }

    pub fn block_recipient(&self, recipient: RecipientId) {
        self.state.lock().unwrap().blocked.insert(recipient);
    }

    /// Let `n` documents through, then fail every further upload.
    pub fn fail_documents_after(&self, n: usize) {
        self.state.lock().unwrap().documents_before_failure = Some(n);
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn texts(&self) -> Vec<(RecipientId, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Text(to, text) => Some((to, text)),
                Event::Document(..) => None,
            })
            .collect()
    }

    pub fn documents(&self) -> Vec<SentDocument> {
        self.state.lock().unwrap().documents.clone()
    }
}

fn forbidden() -> NotifierError {
    NotifierError::Api {
        code: 403,
        description: "Forbidden: bot can't initiate conversation with a user".to_string(),
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, recipient: RecipientId, text: &str) -> Result<(), NotifierError> {
        if !self.text_delay.is_zero() {
            sleep(self.text_delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.blocked.contains(&recipient) {
            return Err(forbidden());
        }
        state.events.push(Event::Text(recipient, text.to_string()));
        Ok(())
    }

    async fn send_document(
        &self,
        recipient: RecipientId,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<(), NotifierError> {
        let mut state = self.state.lock().unwrap();
        if state.blocked.contains(&recipient) {
            return Err(forbidden());
        }
        if let Some(limit) = state.documents_before_failure {
            if state.documents.len() >= limit {
                return Err(NotifierError::Api {
                    code: 429,
                    description: "Too Many Requests".to_string(),
                });
            }
        }

        state
            .events
            .push(Event::Document(recipient, filename.to_string()));
        state.documents.push(SentDocument {
            recipient,
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            body: String::from_utf8(bytes).unwrap(),
            sent_at: Instant::now(),
        });
        Ok(())
    }
}
