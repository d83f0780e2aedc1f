//! Command implementations
//!
//! Each CLI subcommand has a `run` function here. Shared wiring (cache
//! store, HTTP client) lives in this module so the commands stay thin.

pub mod boot;
pub mod cache;
pub mod completions;
pub mod fetch;
pub mod resolve;
pub mod version;

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::error::Result;
use crate::repository::http::HttpRepositoryClient;
use crate::repository::retry::RetryPolicy;

/// Open the cache store, preferring an explicit directory over the
/// environment and platform defaults.
pub(crate) fn open_cache(cache_dir: Option<PathBuf>) -> Result<CacheStore> {
    let root = match cache_dir {
        Some(dir) => dir,
        None => crate::cache::cache_dir()?,
    };
    CacheStore::open(&root)
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<HttpRepositoryClient> {
    HttpRepositoryClient::new(Duration::from_secs(timeout_secs))
}

pub(crate) fn retry_policy(retries: u32) -> RetryPolicy {
    RetryPolicy::with_attempts(retries)
}
