//! Mock search API for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

use super::{ApiError, SearchApi, SearchPage};

/// A failure injected by [`MockApi`].
#[derive(Clone, Debug)]
pub enum MockFailure {
    /// Simulate a non-success HTTP status.
    Status(u16),
    /// Simulate a 401/403 response.
    Unauthorized,
    /// Simulate a response whose envelope could not be parsed.
    Envelope(String),
}

/// A hand-rolled mock implementing [`SearchApi`] for tests.
///
/// Serves slices of a fixed entry list by offset, reporting either the
/// list length or an explicit total. Supports:
/// - Failing from a given call onwards.
/// - Call counting via [`call_count()`](MockApi::call_count).
/// - Recording the offsets requested via [`starts()`](MockApi::starts).
pub struct MockApi {
    entries: Vec<Value>,
    total: usize,
    failure: Option<(usize, MockFailure)>,
    call_count: AtomicUsize,
    starts: Mutex<Vec<usize>>,
}

impl MockApi {
    /// Create a mock serving `entries` and reporting their count as the total.
    pub fn new(entries: Vec<Value>) -> Self {
        let total = entries.len();
        Self {
            entries,
            total,
            failure: None,
            call_count: AtomicUsize::new(0),
            starts: Mutex::new(Vec::new()),
        }
    }

    /// Report `total` in every envelope regardless of the entries served.
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = total;
        self
    }

    /// Fail every call from the zero-based call index `call` onwards.
    pub fn failing_from(mut self, call: usize, failure: MockFailure) -> Self {
        self.failure = Some((call, failure));
        self
    }

    /// How many times `fetch_page()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Offsets requested so far, in call order.
    pub fn starts(&self) -> Vec<usize> {
        self.starts.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl SearchApi for MockApi {
    fn name(&self) -> &str {
        "Mock"
    }

    fn fetch_page<'a>(
        &'a self,
        _query: &'a str,
        start: usize,
        count: usize,
    ) -> Pin<Box<dyn Future<Output = Result<SearchPage, ApiError>> + Send + 'a>> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut starts) = self.starts.lock() {
            starts.push(start);
        }

        Box::pin(async move {
            if let Some((from, ref failure)) = self.failure {
                if call >= from {
                    return Err(match failure {
                        MockFailure::Status(status) => ApiError::Status {
                            status: *status,
                            body: "mock failure".into(),
                        },
                        MockFailure::Unauthorized => ApiError::Unauthorized(401),
                        MockFailure::Envelope(msg) => ApiError::Envelope(msg.clone()),
                    });
                }
            }

            let end = (start + count).min(self.entries.len());
            let entries = if start < end {
                self.entries[start..end].to_vec()
            } else {
                Vec::new()
            };
            Ok(SearchPage {
                total: self.total,
                entries,
            })
        })
    }
}
