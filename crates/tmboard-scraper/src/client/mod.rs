//! HTTP fetcher for the leaderboard pages.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tmboard_core::BoardTable;

use crate::error::ScraperError;
use crate::extract::{extract_table, ExtractOptions, TableRows};
use crate::rate_limit::retry_with_backoff;

/// Source of raw page HTML.
///
/// The refresh loop only depends on this trait, so tests and the CLI can
/// substitute canned pages for the network.
pub trait PageFetcher: Send + Sync {
    /// Fetches the raw HTML at `url`.
    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<String, ScraperError>> + Send;
}

/// reqwest-backed [`PageFetcher`] with a request timeout and retry policy.
///
/// Transient errors (timeouts, connection failures, 429, 5xx) are retried
/// with exponential backoff up to `max_retries` additional attempts.
pub struct BoardClient {
    client: Client,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl BoardClient {
    /// Creates a `BoardClient` with configured timeout, `User-Agent`, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Fetches the page body at `url`.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Timeout`] when the request exceeds the configured timeout.
    /// - [`ScraperError::UnexpectedStatus`] for any non-2xx response.
    /// - [`ScraperError::Http`] for other network or TLS failures.
    pub async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || async move {
            let response = self
                .client
                .get(url)
                .header(reqwest::header::ACCEPT, "text/html,*/*;q=0.8")
                .header(reqwest::header::CACHE_CONTROL, "no-cache")
                .send()
                .await
                .map_err(|e| classify(url, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ScraperError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }

            response.text().await.map_err(|e| classify(url, e))
        })
        .await
    }

    /// Fetches `url` and extracts the rows of `table` from it.
    ///
    /// # Errors
    ///
    /// Any error of [`Self::fetch_html`], or [`ScraperError::Extract`] when
    /// the page does not yield valid rows.
    pub async fn fetch_table(
        &self,
        table: BoardTable,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<TableRows, ScraperError> {
        let body = self.fetch_html(url).await?;
        Ok(extract_table(table, &body, options)?)
    }
}

impl PageFetcher for BoardClient {
    async fn fetch_page(&self, url: &str) -> Result<String, ScraperError> {
        self.fetch_html(url).await
    }
}

fn classify(url: &str, err: reqwest::Error) -> ScraperError {
    if err.is_timeout() {
        ScraperError::Timeout {
            url: url.to_owned(),
        }
    } else {
        ScraperError::Http(err)
    }
}
