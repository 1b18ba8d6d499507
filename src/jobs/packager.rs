// src/jobs/packager.rs
//
// Turns an allocation of records into vCard documents.
//
// Each document holds at most GROUP_SIZE cards. Cards are named
// `<label>-<n>` where n restarts at 1 in every document; files are named
// `<label>_<i>.vcf` with i counting documents from 1.

use crate::jobs::models::Record;

pub const GROUP_SIZE: usize = 5;

pub const VCARD_CONTENT_TYPE: &str = "text/vcard";

/// One rendered file, ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

impl Document {
    pub fn bytes(&self) -> Vec<u8> {
        self.body.as_bytes().to_vec()
    }
}

/// Render a single card stanza.
fn render_card(label: &str, position: usize, record: &Record) -> String {
    format!(
        "BEGIN:VCARD\nVERSION:3.0\nFN:{}-{}\nTEL;TYPE=CELL:{}\nEND:VCARD",
        label,
        position + 1,
        record
    )
}

/// Render one group of records into the text of a single document.
pub fn render_group(label: &str, group: &[Record]) -> String {
    group
        .iter()
        .enumerate()
        .map(|(position, record)| render_card(label, position, record))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split `records` into groups of [`GROUP_SIZE`] and render one document per
/// group. An empty allocation yields no documents.
pub fn package(records: &[Record], label: &str) -> Vec<Document> {
    records
        .chunks(GROUP_SIZE)
        .enumerate()
        .map(|(index, group)| Document {
            filename: format!("{}_{}.vcf", label, index + 1),
            content_type: VCARD_CONTENT_TYPE,
            body: render_group(label, group),
        })
        .collect()
}
