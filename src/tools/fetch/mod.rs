mod client;
mod headers;
mod profile;
mod retry;
mod tests;
mod utils;

pub use profile::FetchProfile;
pub use utils::{build_search_url, is_valid_date_format};

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::types::{PageContent, SearchParams};
use async_trait::async_trait;
use reqwest::Client;
use retry::RetryPolicy;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use utils::{jitter_ms, origin_of};

/// Source of booking pages for a target URL and a stay.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, params: &SearchParams) -> Result<PageContent, FetchError>;
}

/// reqwest-backed fetcher: resolves short links, builds the dated search URL,
/// waits the configured courtesy delay, then GETs with browser headers and
/// retries transport failures.
///
/// # Examples
/// ```no_run
/// use roomwatch::config::FetchConfig;
/// use roomwatch::tools::fetch::{HttpFetcher, PageFetcher};
/// use roomwatch::types::{parse_date, Occupancy, SearchParams};
///
/// # async fn example() -> roomwatch::Result<()> {
/// let fetcher = HttpFetcher::new(FetchConfig::default())?;
/// let params = SearchParams::new(
///     parse_date("2025-12-25")?,
///     parse_date("2025-12-27")?,
///     Occupancy::new(2)?,
/// )?;
/// let page = fetcher.fetch("https://hotel.example.com/plans/1", &params).await?;
/// println!("{} bytes from {}", page.body.len(), page.final_url);
/// # Ok(())
/// # }
/// ```
pub struct HttpFetcher {
    client: Client,
    resolver: Client,
    cfg: FetchConfig,
}

impl HttpFetcher {
    pub fn new(cfg: FetchConfig) -> crate::Result<Self> {
        Ok(Self {
            client: client::build_page_client(&cfg)?,
            resolver: client::build_resolver_client(&cfg)?,
            cfg,
        })
    }

    /// Follow redirects with HEAD to find the canonical page.
    /// Falls back to `url` on any failure.
    pub async fn resolve_url(&self, url: &str) -> String {
        match self.resolver.head(url).send().await {
            Ok(resp) => {
                let resolved = resp.url().to_string();
                if resolved != url {
                    debug!(from = url, to = %resolved, "resolved short url");
                }
                resolved
            }
            Err(e) => {
                warn!(url, error = %e, "could not resolve url, using it as given");
                url.to_string()
            }
        }
    }

    async fn get_once(&self, url: &str) -> Result<(String, u16, String), FetchError> {
        let referer = self.cfg.referer.clone().or_else(|| origin_of(url));
        let headers = headers::request_headers(
            self.cfg.profile,
            &self.cfg.accept_language,
            referer.as_deref(),
        );

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok((body, status.as_u16(), final_url))
    }

    async fn get_with_retry(&self, url: &str) -> Result<(String, u16, String), FetchError> {
        let policy = RetryPolicy::from_config(&self.cfg);
        let mut attempt = 0;
        loop {
            match self.get_once(url).await {
                Ok(ok) => return Ok(ok),
                Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                    let delay = policy.delay(attempt);
                    warn!(url, attempt = attempt + 1, error = %e, ?delay, "fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, params: &SearchParams) -> Result<PageContent, FetchError> {
        let start = Instant::now();

        let resolved_url = if self.cfg.resolve_short_urls {
            self.resolve_url(url).await
        } else {
            url.to_string()
        };
        let search_url = build_search_url(&resolved_url, params, &self.cfg.search)?;

        // Deliberate pause so repeated polls don't look like a burst.
        let pause = self.cfg.pre_request_delay_ms + jitter_ms(self.cfg.jitter_ms);
        if pause > 0 {
            tokio::time::sleep(Duration::from_millis(pause)).await;
        }

        let (body, status, final_url) = self.get_with_retry(&search_url).await?;
        debug!(
            url = %search_url,
            status,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fetched page"
        );

        Ok(PageContent {
            body,
            final_url,
            resolved_url,
            status,
            fetched_at: chrono::Utc::now(),
        })
    }
}
