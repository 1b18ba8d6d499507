// src/ledger/sheets.rs
//
// Google Sheets v4 implementation of `Ledger`.
//
// One tab holds every category, one column each:
// - get:    GET  values/'<tab>'!A:A
// - clear:  POST values/'<tab>'!A:A:clear
// - append: POST values/'<tab>'!A1:append?valueInputOption=RAW

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::ledger::auth::{ServiceAccountKey, TokenProvider, SPREADSHEETS_SCOPE};
use crate::ledger::{Ledger, LedgerError};

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

pub struct SheetsLedger {
    http: Client,
    tokens: TokenProvider,
    api_base: String,
    spreadsheet_id: String,
    sheet_name: String,
}

impl SheetsLedger {
    pub fn new(
        http: Client,
        key: ServiceAccountKey,
        api_base: &str,
        spreadsheet_id: &str,
        sheet_name: &str,
    ) -> Result<Self, LedgerError> {
        let tokens = TokenProvider::new(http.clone(), key, SPREADSHEETS_SCOPE)?;
        info!(
            "Initializing SheetsLedger for spreadsheet={} tab='{}'",
            spreadsheet_id, sheet_name
        );

        Ok(Self {
            http,
            tokens,
            api_base: api_base.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
        })
    }

    /// `'DB BBW'!A:A`
    fn column_range(&self, column: &str) -> String {
        format!("{}!{}:{}", quote_sheet_name(&self.sheet_name), column, column)
    }

    /// `'DB BBW'!A1`
    fn anchor_range(&self, column: &str) -> String {
        format!("{}!{}1", quote_sheet_name(&self.sheet_name), column)
    }

    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, LedgerError> {
        values_url(&self.api_base, &self.spreadsheet_id, range, suffix)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, LedgerError> {
        let token = self.tokens.token().await?;
        let response = request.bearer_auth(token).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("Sheets API returned {}: {}", status, body);
            return Err(LedgerError::Api { status, body });
        }

        Ok(response)
    }
}

/// `<base>/v4/spreadsheets/<id>/values/<range><suffix>` with the range percent-encoded.
fn values_url(
    api_base: &str,
    spreadsheet_id: &str,
    range: &str,
    suffix: &str,
) -> Result<Url, LedgerError> {
    let mut url = Url::parse(api_base).map_err(|e| LedgerError::Url(e.to_string()))?;
    let target = format!("{range}{suffix}");
    url.path_segments_mut()
        .map_err(|_| LedgerError::Url(format!("{} cannot be a base", api_base)))?
        .pop_if_empty()
        .extend(["v4", "spreadsheets", spreadsheet_id, "values", target.as_str()]);
    Ok(url)
}

/// Tab names with spaces or punctuation must be single-quoted in A1 notation.
fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Sheets returns formatted strings, but numbers can come back raw.
fn cell_to_string(cell: Option<&Value>) -> String {
    match cell {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl Ledger for SheetsLedger {
    async fn get_column(&self, column: &str) -> Result<Vec<String>, LedgerError> {
        let url = self.values_url(&self.column_range(column), "")?;
        let response = self.send(self.http.get(url)).await?;

        let range: ValueRange = response.json().await?;
        Ok(range
            .values
            .iter()
            .map(|row| cell_to_string(row.first()))
            .collect())
    }

    async fn clear_column(&self, column: &str) -> Result<(), LedgerError> {
        let url = self.values_url(&self.column_range(column), ":clear")?;
        self.send(self.http.post(url).json(&json!({}))).await?;
        Ok(())
    }

    async fn append_column(&self, column: &str, values: &[String]) -> Result<(), LedgerError> {
        let url = self.values_url(&self.anchor_range(column), ":append")?;
        let rows: Vec<Vec<&str>> = values.iter().map(|v| vec![v.as_str()]).collect();

        self.send(
            self.http
                .post(url)
                .query(&[("valueInputOption", "RAW")])
                .json(&json!({ "values": rows })),
        )
        .await?;
        Ok(())
    }
}
