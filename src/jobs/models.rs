use std::fmt;

use uuid::Uuid;

/// Telegram chat or user id. Group chats are negative, private chats positive.
pub type RecipientId = i64;

/// Minimum number of digits a normalized record must have to be handed out.
pub const MIN_RECORD_DIGITS: usize = 10;

/// Pool a request draws from. Each category owns one column of the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Fresh,
    FollowUp,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Fresh, Category::FollowUp];

    /// Command keyword, without the leading `#`.
    pub fn keyword(&self) -> &'static str {
        match self {
            Category::Fresh => "vcardfresh",
            Category::FollowUp => "vcardfu",
        }
    }

    /// Column letter in the ledger sheet.
    pub fn storage_column(&self) -> &'static str {
        match self {
            Category::Fresh => "A",
            Category::FollowUp => "D",
        }
    }

    /// Label used for card names and file names.
    pub fn display_label(&self) -> &'static str {
        match self {
            Category::Fresh => "FRESH",
            Category::FollowUp => "FU",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| c.keyword().eq_ignore_ascii_case(keyword))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A normalized, digits-only phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record(String);

impl Record {
    /// Strip everything but ASCII digits; reject anything shorter than
    /// [`MIN_RECORD_DIGITS`].
    pub fn normalize(raw: &str) -> Option<Record> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() >= MIN_RECORD_DIGITS {
            Some(Record(digits))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a raw ledger column, keeping source order and duplicates.
pub fn normalize_pool<S: AsRef<str>>(raw: &[S]) -> Vec<Record> {
    raw.iter()
        .filter_map(|cell| Record::normalize(cell.as_ref()))
        .collect()
}

/// One requester's request for `quantity` records of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: Uuid,
    /// Chat the command was posted in; status messages go here.
    pub requester_channel: RecipientId,
    /// The requester's own user id; documents are delivered here privately.
    pub requester_identity: RecipientId,
    pub quantity: usize,
    pub category: Category,
}

impl Job {
    pub fn new(
        requester_channel: RecipientId,
        requester_identity: RecipientId,
        category: Category,
        quantity: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester_channel,
            requester_identity,
            quantity,
            category,
        }
    }
}

/// How a job ended. Errors are reported separately as `JobError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Delivered {
        delivered: usize,
        documents: usize,
        remaining: usize,
    },
    InsufficientStock {
        available: usize,
        requested: usize,
    },
}
