// src/jobs/command.rs
//
// Chat command grammar.
//
// - `/start`                 -> usage message
// - `#<keyword> <quantity>`  -> queue a job (keyword is case-insensitive)
// - anything else            -> ignored

use lazy_static::lazy_static;
use regex::Regex;

use crate::jobs::models::Category;

lazy_static! {
    static ref REQUEST_RE: Regex =
        Regex::new(r"(?i)^#(vcardfresh|vcardfu)\s+(\d+)").expect("request regex must compile");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Request { category: Category, quantity: usize },
}

/// Parse an inbound chat text. Returns `None` for text the bot does not react to.
///
/// A quantity of zero, or one too large to represent, is not a request.
pub fn parse(text: &str) -> Option<Command> {
    if text == "/start" {
        return Some(Command::Start);
    }

    let caps = REQUEST_RE.captures(text)?;
    let category = Category::from_keyword(&caps[1])?;
    let quantity: usize = caps[2].parse().ok()?;
    if quantity == 0 {
        return None;
    }

    Some(Command::Request { category, quantity })
}

/// Usage text returned for `/start`.
pub fn usage() -> String {
    let lines: Vec<String> = Category::ALL
        .iter()
        .map(|c| format!("#{} JUMLAH", c.keyword()))
        .collect();
    format!("✅ Bot aktif. Gunakan:\n{}", lines.join("\n"))
}
