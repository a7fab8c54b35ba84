use std::path::PathBuf;
use thiserror::Error;

pub mod api;
pub mod cache;
pub mod config_file;
pub mod record;
pub mod search;

// Re-export for convenience
pub use api::elsevier::ElsevierApi;
pub use api::{ApiError, SearchApi, SearchPage};
pub use cache::{CacheError, SearchCache, cache_key};
pub use record::{Document, MalformedItem, map_items, to_records};
pub use search::ScopusSearch;

/// Number of entries requested per page.
pub const PAGE_SIZE: usize = 25;

/// Default ceiling on the reported result count of a single query.
pub const MAX_ENTRIES: usize = 5000;

/// Default Scopus Search API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.elsevier.com/content/search/scopus";

#[derive(Error, Debug)]
pub enum ScopusError {
    #[error("search {query:?} failed: {source}")]
    Transport {
        query: String,
        #[source]
        source: ApiError,
    },
    #[error(
        "search {query:?} found {total} matches, more than the maximum of {max}; narrow the query or raise max_entries"
    )]
    ResultSetTooLarge {
        query: String,
        total: usize,
        max: usize,
    },
    #[error("search {query:?} returned a malformed response: {reason}")]
    MalformedResponse { query: String, reason: String },
    #[error("cache error for search {query:?}: {source}")]
    Cache {
        query: String,
        #[source]
        source: CacheError,
    },
}

/// Configuration for a search, passed explicitly at construction.
#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    /// Institutional token, sent alongside the API key when set.
    pub inst_token: Option<String>,
    /// Directory holding one JSON file per cached query.
    pub cache_dir: PathBuf,
    /// Queries reporting more results than this fail before paging.
    pub max_entries: usize,
    pub timeout_secs: u64,
    pub base_url: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("inst_token", &self.inst_token.as_ref().map(|_| "***"))
            .field("cache_dir", &self.cache_dir)
            .field("max_entries", &self.max_entries)
            .field("timeout_secs", &self.timeout_secs)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            inst_token: None,
            cache_dir: default_cache_dir(),
            max_entries: MAX_ENTRIES,
            timeout_secs: 30,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Platform cache directory for search results: `<cache_dir>/scopus/search`.
///
/// Falls back to `.scopus/search` under the current directory when the
/// platform has no cache directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".scopus"))
        .join("scopus")
        .join("search")
}
