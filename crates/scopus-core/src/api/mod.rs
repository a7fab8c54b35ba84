//! Search API trait and implementations for fetching result pages.

pub mod elsevier;
pub mod mock;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use thiserror::Error;

/// One page of search results together with the envelope's total count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    /// Total number of results the API reports for the query.
    pub total: usize,
    pub entries: Vec<Value>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unauthorized (HTTP {0}): check the API key and institutional token")]
    Unauthorized(u16),
    #[error("rate limited (429)")]
    RateLimited,
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response envelope: {0}")]
    Envelope(String),
}

/// A paged search endpoint.
pub trait SearchApi: Send + Sync {
    /// Name used in log lines (e.g., "Scopus").
    fn name(&self) -> &str;

    /// Fetch `count` results for `query` starting at offset `start`.
    fn fetch_page<'a>(
        &'a self,
        query: &'a str,
        start: usize,
        count: usize,
    ) -> Pin<Box<dyn Future<Output = Result<SearchPage, ApiError>> + Send + 'a>>;
}

/// Extract the total count and entries from a `search-results` envelope.
///
/// The API answers an empty result set with a single placeholder entry
/// carrying an `error` field; such entries are dropped.
pub fn parse_envelope(data: &Value) -> Result<SearchPage, ApiError> {
    let results = data
        .get("search-results")
        .ok_or_else(|| ApiError::Envelope("missing 'search-results'".into()))?;

    let total = match results.get("opensearch:totalResults") {
        Some(Value::String(s)) => s.trim().parse::<usize>().map_err(|_| {
            ApiError::Envelope(format!("'opensearch:totalResults' is not a count: {s:?}"))
        })?,
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| ApiError::Envelope(format!("'opensearch:totalResults' is {n}")))?,
        _ => {
            return Err(ApiError::Envelope(
                "missing 'opensearch:totalResults'".into(),
            ));
        }
    };

    let entries = match results.get("entry") {
        Some(Value::Array(arr)) => arr
            .iter()
            .filter(|e| e.get("error").is_none())
            .cloned()
            .collect(),
        None if total == 0 => Vec::new(),
        Some(_) => return Err(ApiError::Envelope("'entry' is not an array".into())),
        None => return Err(ApiError::Envelope("missing 'entry'".into())),
    };

    Ok(SearchPage { total, entries })
}
