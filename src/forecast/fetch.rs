//! Downloading forecast pages and tables.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::cache::ExpiringCache;
use crate::config::Config;
use crate::error::ForecastError;

/// Source of forecast documents (HTML pages, CSV files) by URL.
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    /// Body of the document at `url`.
    async fn fetch_text(&self, url: &str) -> Result<String, ForecastError>;
}

/// Fetches over HTTP, keeping bodies for the scrape cache lifetime.
#[derive(Debug)]
pub struct HttpFetcher {
    http: reqwest::Client,
    cache: ExpiringCache<String, String>,
}

impl HttpFetcher {
    /// Fetcher with the configured timeout and cache lifetime.
    pub fn new(config: &Config) -> Result<Self, ForecastError> {
        Self::with_ttl(config.http_timeout(), config.scrape_cache_ttl())
    }

    /// Fetcher with explicit timeout and cache lifetime.
    pub fn with_ttl(timeout: Duration, ttl: Duration) -> Result<Self, ForecastError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()
            .map_err(|e| ForecastError::Download {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            cache: ExpiringCache::new(ttl),
        })
    }

    async fn download(&self, url: &str) -> Result<String, ForecastError> {
        let download_error = |reason: String| ForecastError::Download {
            url: url.to_string(),
            reason,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(download_error(format!("HTTP {}", response.status())));
        }
        let body = response
            .text()
            .await
            .map_err(|e| download_error(e.to_string()))?;
        debug!(bytes = body.len(), "Downloaded forecast document");
        Ok(body)
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String, ForecastError> {
        self.cache
            .get_or_try_insert_with(url.to_string(), || self.download(url))
            .await
    }
}

/// In-memory documents keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    /// Empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }
}

impl PageFetcher for StaticFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, ForecastError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ForecastError::Download {
                url: url.to_string(),
                reason: "no such page".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_fetcher_serves_pages() {
        let fetcher = StaticFetcher::new().with_page("https://a", "body");
        assert_eq!(fetcher.fetch_text("https://a").await.unwrap(), "body");
        assert!(matches!(
            fetcher.fetch_text("https://b").await,
            Err(ForecastError::Download { .. })
        ));
    }

    #[test]
    fn http_fetcher_builds() {
        let fetcher = HttpFetcher::new(&Config::default()).unwrap();
        assert_eq!(fetcher.cache.ttl(), Duration::from_secs(240));
    }
}
