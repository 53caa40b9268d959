use crate::config::FetchConfig;
use crate::error::{Result, RoomwatchError};
use reqwest::{redirect, Client};
use std::time::Duration;

const REDIRECT_LIMIT: usize = 10;
const POOL_IDLE_TIMEOUT_SEC: u64 = 90;

/// Client used for the page GET.
pub(crate) fn build_page_client(cfg: &FetchConfig) -> Result<Client> {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::limited(REDIRECT_LIMIT))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .connect_timeout(Duration::from_secs(cfg.timeout_secs))
        .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SEC))
        .build()
        .map_err(|e| RoomwatchError::config_error(format!("failed to build client: {e}")))
}

/// Client used to follow short links with HEAD; shorter timeout, no cookies.
pub(crate) fn build_resolver_client(cfg: &FetchConfig) -> Result<Client> {
    Client::builder()
        .redirect(redirect::Policy::limited(REDIRECT_LIMIT))
        .timeout(Duration::from_secs(cfg.resolve_timeout_secs))
        .connect_timeout(Duration::from_secs(cfg.resolve_timeout_secs))
        .build()
        .map_err(|e| RoomwatchError::config_error(format!("failed to build resolver: {e}")))
}
