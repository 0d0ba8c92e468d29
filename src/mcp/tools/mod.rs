//! MCP tools for interacting with the Planday API.
//!
//! Each module implements a specific tool group:
//! - `auth`: Authenticate with a refresh token, inspect or clear the session
//! - `shifts`: Scheduled shifts with employee, department, position and shift type names
//! - `absence`: Absence records with employee names
//! - `payroll`: Payroll lines with employee, department, position and group names
//!
//! All tools use the shared `PlandayClient` and error handling.

pub mod absence;
pub mod auth;
pub mod payroll;
pub mod shifts;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::mcp::{
    error::PlandayError,
    http::{ApiRequest, PlandayClient},
    models::{Paged, listing_exhausted},
};

const PAGE_SIZE: usize = 50;
const MAX_PAGES: usize = 40;

/// Parses a `YYYY-MM-DD` tool argument.
pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate, PlandayError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        PlandayError::InvalidParams(format!("{field} must be a date in YYYY-MM-DD format, got '{value}'"))
    })
}

/// Parses and orders a `from`/`to` pair.
pub(crate) fn parse_range(from: &str, to: &str) -> Result<(NaiveDate, NaiveDate), PlandayError> {
    let from = parse_date("from", from)?;
    let to = parse_date("to", to)?;
    if from > to {
        return Err(PlandayError::InvalidParams(format!(
            "from ({from}) must not be after to ({to})"
        )));
    }
    Ok((from, to))
}

/// Follows `limit`/`offset` paging of a listing until it is exhausted or
/// `MAX_PAGES` pages were read.
pub(crate) async fn fetch_all_pages<T: DeserializeOwned>(
    client: &PlandayClient,
    request: &ApiRequest,
) -> Result<Vec<T>, PlandayError> {
    let mut items = Vec::new();

    for _ in 0..MAX_PAGES {
        let page_request = request
            .clone()
            .query("limit", PAGE_SIZE)
            .query("offset", items.len());
        let page: Paged<T> = serde_json::from_value(client.call(&page_request).await?)?;

        let fetched = page.data.len();
        items.extend(page.data);

        let total = page.paging.and_then(|paging| paging.total);
        if listing_exhausted(fetched, PAGE_SIZE, items.len(), total) {
            return Ok(items);
        }
    }

    warn!(
        path = request.path(),
        returned = items.len(),
        "listing truncated after {MAX_PAGES} pages, narrow the date range or filters"
    );
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_must_be_iso() {
        assert_eq!(
            parse_date("from", " 2026-03-02 ").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
        assert!(matches!(
            parse_date("from", "02-03-2026"),
            Err(PlandayError::InvalidParams(msg)) if msg.contains("from")
        ));
    }

    #[test]
    fn ranges_must_be_ordered() {
        assert!(parse_range("2026-03-01", "2026-03-01").is_ok());
        assert!(matches!(
            parse_range("2026-03-09", "2026-03-01"),
            Err(PlandayError::InvalidParams(_))
        ));
    }
}
