//! Published key sets (JWKS) for OIDC token verification.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use thiserror::Error;

const JWKS_CACHE_TTL: Duration = Duration::from_secs(300);
/// Forced refreshes (unknown `kid`) reuse a key set younger than this.
const JWKS_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum JwksError {
    #[error("failed to fetch JWK set from {url}: {reason}")]
    Fetch { url: String, reason: String },
}

/// Where key sets come from.
#[async_trait]
pub trait JwksSource: Send + Sync {
    /// Return the key set published at `url`. `refresh` asks for a newer copy
    /// than the cache would normally serve.
    async fn key_set(&self, url: &str, refresh: bool) -> Result<Arc<JwkSet>, JwksError>;
}

#[derive(Clone)]
struct CachedKeys {
    fetched_at: Instant,
    keys: Arc<JwkSet>,
}

/// HTTP-backed key sets with a short per-URL cache.
///
/// The cache lock is only held to read or replace an entry, never across the fetch.
/// A forced refresh is served from cache while the entry is younger than
/// `min_refresh`, so tokens with unknown `kid`s cannot trigger a fetch per request.
pub struct HttpJwksSource {
    client: reqwest::Client,
    ttl: Duration,
    min_refresh: Duration,
    cache: Mutex<HashMap<String, CachedKeys>>,
}

impl HttpJwksSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            ttl: JWKS_CACHE_TTL,
            min_refresh: JWKS_MIN_REFRESH_INTERVAL,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, url: &str, max_age: Duration) -> Option<Arc<JwkSet>> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .get(url)
            .filter(|entry| entry.fetched_at.elapsed() < max_age)
            .map(|entry| Arc::clone(&entry.keys))
    }

    async fn fetch(&self, url: &str) -> Result<JwkSet, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await
    }
}

#[async_trait]
impl JwksSource for HttpJwksSource {
    async fn key_set(&self, url: &str, refresh: bool) -> Result<Arc<JwkSet>, JwksError> {
        let max_age = if refresh { self.min_refresh } else { self.ttl };
        if let Some(keys) = self.cached(url, max_age) {
            return Ok(keys);
        }

        let keys = self.fetch(url).await.map_err(|e| JwksError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let keys = Arc::new(keys);

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.insert(
            url.to_string(),
            CachedKeys {
                fetched_at: Instant::now(),
                keys: Arc::clone(&keys),
            },
        );

        Ok(keys)
    }
}

/// Fixed key set for tests.
#[cfg(test)]
pub struct StaticJwks {
    keys: Option<Arc<JwkSet>>,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl StaticJwks {
    pub fn new(keys: JwkSet) -> Self {
        Self {
            keys: Some(Arc::new(keys)),
            calls: Default::default(),
        }
    }

    /// A source whose fetches always fail.
    pub fn empty() -> Self {
        Self {
            keys: None,
            calls: Default::default(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl JwksSource for StaticJwks {
    async fn key_set(&self, url: &str, _refresh: bool) -> Result<Arc<JwkSet>, JwksError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.keys {
            Some(keys) => Ok(Arc::clone(keys)),
            None => Err(JwksError::Fetch {
                url: url.to_string(),
                reason: "connection refused".into(),
            }),
        }
    }
}
