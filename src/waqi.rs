//! Client for the World Air Quality Index (WAQI) city feed API.
//!
//! [`WaqiClient`] fetches `{base_url}/{city}/?token={token}` and hands back
//! the `data` object of an `ok` response. Feeds are kept in a [`FeedCache`]
//! for a configurable time-to-live so repeated dashboard loads do not hit
//! the API again.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::models::{CityFeed, FeedEnvelope};

// ---

/// Error type for WAQI fetch failures.
#[derive(Debug, thiserror::Error)]
pub enum WaqiError {
    /// Network, DNS, timeout or body decoding failure.
    #[error("WAQI request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-2xx status code.
    #[error("WAQI returned HTTP {0}")]
    HttpStatus(u16),

    /// The `data` object of an `ok` response did not match the feed shape.
    #[error("Malformed WAQI feed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A city feed together with the name it was requested under.
#[derive(Debug, Clone)]
pub struct QueriedFeed {
    // ---
    pub query_city: String,
    pub feed: CityFeed,
}

// ---

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    city: String,
    token: String,
}

struct CacheEntry {
    fetched_at: Instant,
    feed: CityFeed,
}

/// Time-to-live cache of city feeds keyed by `(city, token)`.
///
/// The lock is only held for map lookups and inserts, never across the
/// fetch itself.
pub struct FeedCache {
    // ---
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl FeedCache {
    // ---
    pub fn new(ttl: Duration) -> Self {
        // ---
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<CityFeed> {
        // ---
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.feed.clone())
    }

    /// Insert a feed, dropping expired entries so the map only holds live ones.
    fn store(&self, key: CacheKey, feed: CityFeed) {
        // ---
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
        entries.insert(
            key,
            CacheEntry {
                fetched_at: Instant::now(),
                feed,
            },
        );
    }

    /// Return a fresh cached feed, or run `fetch` and cache its `Some` result.
    ///
    /// The boolean is `true` when the value came from the cache. "No data"
    /// answers and errors are not cached.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        city: &str,
        token: &str,
        fetch: F,
    ) -> Result<(Option<CityFeed>, bool), WaqiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<CityFeed>, WaqiError>>,
    {
        // ---
        let key = CacheKey {
            city: city.to_string(),
            token: token.to_string(),
        };

        if let Some(feed) = self.lookup(&key) {
            debug!("Cache hit for '{}'", city);
            return Ok((Some(feed), true));
        }

        let fetched = fetch().await?;
        if let Some(feed) = &fetched {
            self.store(key, feed.clone());
        }
        Ok((fetched, false))
    }

    /// Drop every entry, returning how many were removed.
    pub fn clear(&self) -> usize {
        // ---
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        // ---
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

// ---

/// WAQI feed client with a shared cache.
#[derive(Clone)]
pub struct WaqiClient {
    // ---
    http: reqwest::Client,
    base_url: String,
    fetch_delay: Duration,
    cache: Arc<FeedCache>,
}

impl WaqiClient {
    // ---
    pub fn new(
        base_url: &str,
        timeout: Duration,
        fetch_delay: Duration,
        cache_ttl: Duration,
    ) -> Result<Self, WaqiError> {
        // ---
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            fetch_delay,
            cache: Arc::new(FeedCache::new(cache_ttl)),
        })
    }

    pub fn cache(&self) -> &FeedCache {
        // ---
        &self.cache
    }

    fn feed_url(&self, city: &str) -> String {
        // ---
        format!("{}/{}/", self.base_url, city)
    }

    /// Fetch one city feed straight from the API, bypassing the cache.
    ///
    /// Returns `Ok(None)` when the API answers with a non-`ok` status
    /// (unknown city, bad token, over quota).
    pub async fn fetch_city_feed(
        &self,
        city: &str,
        token: &str,
    ) -> Result<Option<CityFeed>, WaqiError> {
        // ---
        let url = self.feed_url(city);
        debug!("Fetching WAQI feed from: {}", url);

        let response = self
            .http
            .get(&url)
            .query(&[("token", token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WaqiError::HttpStatus(status.as_u16()));
        }

        let envelope: FeedEnvelope = response.json().await?;
        parse_envelope(city, envelope)
    }

    /// Fetch several cities in order, using the cache where possible.
    ///
    /// Cities that fail or have no data are logged and left out. The client
    /// pauses `fetch_delay` after every network request.
    pub async fn fetch_cities(&self, cities: &[String], token: &str) -> Vec<QueriedFeed> {
        // ---
        let mut feeds = Vec::with_capacity(cities.len());

        for (i, city) in cities.iter().enumerate() {
            debug!("Fetching data for {} ({}/{})", city, i + 1, cities.len());

            let result = self
                .cache
                .get_or_fetch(city, token, || self.fetch_city_feed(city, token))
                .await;

            let cached = matches!(result, Ok((_, true)));
            match result {
                Ok((Some(feed), _)) => feeds.push(QueriedFeed {
                    query_city: city.clone(),
                    feed,
                }),
                Ok((None, _)) => warn!(city = %city, "WAQI returned no data"),
                Err(e) => warn!(city = %city, error = %e, "WAQI fetch failed"),
            }

            if !cached && !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }
        }

        info!(
            "Data collection complete: {} of {} cities returned data",
            feeds.len(),
            cities.len()
        );
        feeds
    }
}

/// Turn a WAQI response envelope into a feed, or `None` for a non-`ok` status.
fn parse_envelope(city: &str, envelope: FeedEnvelope) -> Result<Option<CityFeed>, WaqiError> {
    // ---
    if envelope.status != "ok" {
        debug!(
            "WAQI status '{}' for '{}': {}",
            envelope.status, city, envelope.data
        );
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(envelope.data)?))
}
