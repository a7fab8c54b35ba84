//! Cached, paged retrieval of a Scopus search.
//!
//! A search is loaded from the [`SearchCache`] when an entry exists for the
//! exact query text, unless a refresh is requested. Otherwise every page is
//! fetched in order and the merged entries replace the cache entry. Nothing
//! is written unless the whole result set was fetched.

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;

use crate::api::{ApiError, SearchApi};
use crate::cache::{CacheError, SearchCache};
use crate::record::{self, Document, MalformedItem};
use crate::{Config, PAGE_SIZE, ScopusError};

/// Results of one query, loaded from cache or fetched from the API.
#[derive(Debug, Clone)]
pub struct ScopusSearch {
    query: String,
    items: Vec<Value>,
    from_cache: bool,
    cache_path: PathBuf,
}

impl ScopusSearch {
    /// Run `query`, reusing the cached result set unless `refresh` is set.
    pub async fn new(
        query: impl Into<String>,
        refresh: bool,
        api: &dyn SearchApi,
        config: &Config,
    ) -> Result<Self, ScopusError> {
        let query = query.into();
        let cache = SearchCache::new(&config.cache_dir);
        let (items, from_cache) =
            load_or_fetch(&query, refresh, api, &cache, config.max_entries).await?;
        Ok(Self {
            cache_path: cache.path_for(&query),
            query,
            items,
            from_cache,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the results came from the cache rather than the API.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    pub fn cache_path(&self) -> &std::path::Path {
        &self.cache_path
    }

    /// The raw entries in stored order.
    pub fn raw_items(&self) -> &[Value] {
        &self.items
    }

    /// EIDs of the retrieved documents, in stored order.
    ///
    /// Entries without an EID are left out with a warning naming their position.
    pub fn identifiers(&self) -> Vec<String> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(position, item)| match eid_of(item) {
                Some(eid) => Some(eid.to_string()),
                None => {
                    tracing::warn!(query = %self.query, position, "entry has no EID");
                    None
                }
            })
            .collect()
    }

    /// Outdated alias of [`identifiers`](Self::identifiers).
    ///
    /// Logs a deprecation warning on every call.
    pub fn eids(&self) -> Vec<String> {
        tracing::warn!(
            "ScopusSearch::eids is deprecated and will be removed in a future release; use identifiers() instead"
        );
        self.identifiers()
    }

    /// Documents for all well-formed entries, in stored order.
    pub fn records(&self) -> Vec<Document> {
        record::to_records(&self.items)
    }

    /// Per-entry mapping outcomes, one per stored entry.
    pub fn map_items(&self) -> Vec<Result<Document, MalformedItem>> {
        record::map_items(&self.items)
    }
}

impl fmt::Display for ScopusSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let eids: Vec<&str> = self.items.iter().filter_map(eid_of).collect();
        write!(
            f,
            "Search {} yielded in {} documents:\n    {}",
            self.query,
            self.items.len(),
            eids.join("\n    ")
        )?;
        let missing = self.items.len() - eids.len();
        if missing > 0 {
            write!(f, "\n    ({} without an EID)", missing)?;
        }
        Ok(())
    }
}

fn eid_of(item: &Value) -> Option<&str> {
    item.get("eid").and_then(Value::as_str)
}

/// Return the entries for `query`, from the cache or, on a miss or
/// `refresh`, from the API (replacing the cache entry).
pub async fn retrieve(
    query: &str,
    refresh: bool,
    api: &dyn SearchApi,
    cache: &SearchCache,
    max_entries: usize,
) -> Result<Vec<Value>, ScopusError> {
    load_or_fetch(query, refresh, api, cache, max_entries)
        .await
        .map(|(items, _)| items)
}

async fn load_or_fetch(
    query: &str,
    refresh: bool,
    api: &dyn SearchApi,
    cache: &SearchCache,
    max_entries: usize,
) -> Result<(Vec<Value>, bool), ScopusError> {
    let cache_err = |source: CacheError| ScopusError::Cache {
        query: query.to_string(),
        source,
    };

    if !refresh {
        if let Some(items) = cache.load(query).map_err(cache_err)? {
            tracing::debug!(query, items = items.len(), "loaded search from cache");
            return Ok((items, true));
        }
        tracing::debug!(query, "no cached search, fetching");
    } else {
        tracing::debug!(query, "refresh requested, fetching");
    }

    let items = fetch_all(query, api, max_entries).await?;
    let path = cache.store(query, &items).map_err(cache_err)?;
    tracing::info!(
        query,
        db = api.name(),
        items = items.len(),
        path = %path.display(),
        "fetched and cached search"
    );
    Ok((items, false))
}

/// Fetch every page of `query` in order.
///
/// Fails with [`ScopusError::ResultSetTooLarge`] as soon as the first page
/// reports more than `max_entries` results.
pub async fn fetch_all(
    query: &str,
    api: &dyn SearchApi,
    max_entries: usize,
) -> Result<Vec<Value>, ScopusError> {
    let first = api
        .fetch_page(query, 0, PAGE_SIZE)
        .await
        .map_err(|e| api_error(query, e))?;

    let total = first.total;
    if total > max_entries {
        return Err(ScopusError::ResultSetTooLarge {
            query: query.to_string(),
            total,
            max: max_entries,
        });
    }
    tracing::debug!(query, total, "first page received");

    let mut items = first.entries;
    items.reserve(total.saturating_sub(items.len()));

    while items.len() < total {
        let start = items.len();
        tracing::trace!(query, start, total, "requesting page");
        let page = api
            .fetch_page(query, start, PAGE_SIZE)
            .await
            .map_err(|e| api_error(query, e))?;
        if page.entries.is_empty() {
            return Err(ScopusError::MalformedResponse {
                query: query.to_string(),
                reason: format!(
                    "page at offset {start} had no entries, {} of {total} results received",
                    items.len()
                ),
            });
        }
        items.extend(page.entries);
    }

    Ok(items)
}

fn api_error(query: &str, err: ApiError) -> ScopusError {
    match err {
        ApiError::Envelope(reason) => ScopusError::MalformedResponse {
            query: query.to_string(),
            reason,
        },
        source => ScopusError::Transport {
            query: query.to_string(),
            source,
        },
    }
}
