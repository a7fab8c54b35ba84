use super::{ApiError, SearchApi, SearchPage, parse_envelope};
use crate::Config;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Result view requested from the API; COMPLETE carries author and affiliation data.
const VIEW: &str = "COMPLETE";

/// Scopus Search API over HTTPS.
pub struct ElsevierApi {
    client: reqwest::Client,
    pub api_key: Option<String>,
    pub inst_token: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl ElsevierApi {
    pub fn new(config: &Config) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Build on an existing client (shared connection pool, custom proxy, ...).
    pub fn with_client(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            inst_token: config.inst_token.clone(),
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Classify a non-success response; successful responses are passed through.
///
/// 401/403 map to [`ApiError::Unauthorized`], 429 to [`ApiError::RateLimited`],
/// anything else unsuccessful to [`ApiError::Status`] carrying the body.
pub async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    match status.as_u16() {
        401 | 403 => Err(ApiError::Unauthorized(status.as_u16())),
        429 => Err(ApiError::RateLimited),
        _ if status.is_success() => Ok(resp),
        code => {
            let body = resp.text().await.unwrap_or_default();
            Err(ApiError::Status { status: code, body })
        }
    }
}

impl SearchApi for ElsevierApi {
    fn name(&self) -> &str {
        "Scopus"
    }

    fn fetch_page<'a>(
        &'a self,
        query: &'a str,
        start: usize,
        count: usize,
    ) -> Pin<Box<dyn Future<Output = Result<SearchPage, ApiError>> + Send + 'a>> {
        Box::pin(async move {
            let start = start.to_string();
            let count = count.to_string();
            let mut req = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("query", query),
                    ("start", start.as_str()),
                    ("count", count.as_str()),
                    ("view", VIEW),
                ])
                .header("Accept", "application/json")
                .timeout(self.timeout);

            if let Some(ref key) = self.api_key {
                req = req.header("X-ELS-APIKey", key);
            }
            if let Some(ref token) = self.inst_token {
                req = req.header("X-ELS-Insttoken", token);
            }

            let resp = check_status(req.send().await?).await?;

            let data: serde_json::Value = resp.json().await?;
            parse_envelope(&data)
        })
    }
}
