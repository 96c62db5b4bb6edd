// TTL response cache + in-flight request registry.
//
// Every catalog fetch goes through here. Concurrent callers asking for the
// same canonical key share a single underlying request: the first caller
// installs a `Shared` future in the registry and everyone else awaits a
// clone of it, so one HTTP round-trip serves all of them (success or
// failure alike). Successful responses also land in a TTL cache so repeat
// requests within a short window never touch the network.
//
// All state lives behind one mutex, shared by every consumer that holds a
// clone of the cache. The lock is only held for map lookups, never across
// an await.

use crate::error::FetchError;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;

struct CacheEntry<T> {
    value: T,
    stored_at: Instant,
}

struct Inner<T> {
    cache: HashMap<String, CacheEntry<T>>,
    in_flight: HashMap<String, SharedFetch<T>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    /// Overrides the cache's default TTL for this request.
    pub cache_ttl: Option<Duration>,
    /// Ignore any cached value; the response still refreshes the cache.
    pub skip_cache: bool,
    /// Do not join (or register) an in-flight request for this key.
    pub skip_deduplication: bool,
}

impl RequestOptions {
    /// Cache-busting variant used by pagination appends: always hits the
    /// network and never piggybacks on the page-1 request.
    pub fn force_refresh() -> Self {
        RequestOptions {
            cache_ttl: None,
            skip_cache: true,
            skip_deduplication: true,
        }
    }
}

pub struct RequestCache<T> {
    inner: Arc<Mutex<Inner<T>>>,
    default_ttl: Duration,
}

impl<T> Clone for RequestCache<T> {
    fn clone(&self) -> Self {
        RequestCache {
            inner: Arc::clone(&self.inner),
            default_ttl: self.default_ttl,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> RequestCache<T> {
    pub fn new(default_ttl: Duration) -> Self {
        RequestCache {
            inner: Arc::new(Mutex::new(Inner {
                cache: HashMap::new(),
                in_flight: HashMap::new(),
            })),
            default_ttl,
        }
    }

    /// Runs `fetcher` at most once per canonical `key`, subject to `opts`.
    ///
    /// Cached values younger than the TTL are returned without running the
    /// fetcher at all. Otherwise the caller either joins an in-flight
    /// request for the same key or starts a new one. Failures evict the
    /// in-flight entry and propagate to every waiter; no retry happens at
    /// this layer.
    pub async fn request<F>(
        &self,
        key: &str,
        opts: RequestOptions,
        fetcher: F,
    ) -> Result<T, FetchError>
    where
        F: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let ttl = opts.cache_ttl.unwrap_or(self.default_ttl);

        let shared = {
            let mut inner = self.inner.lock().expect("request cache lock poisoned");

            if !opts.skip_cache {
                if let Some(entry) = inner.cache.get(key) {
                    if entry.stored_at.elapsed() < ttl {
                        tracing::debug!(key, "request cache hit");
                        return Ok(entry.value.clone());
                    }
                }
            }

            if opts.skip_deduplication {
                // Forced refresh: run standalone, but still record the
                // response for later cache hits.
                self.settle_into_cache(key.to_string(), false, fetcher)
            } else if let Some(existing) = inner.in_flight.get(key) {
                tracing::debug!(key, "joining in-flight request");
                existing.clone()
            } else {
                let shared = self.settle_into_cache(key.to_string(), true, fetcher);
                inner.in_flight.insert(key.to_string(), shared.clone());
                shared
            }
        };

        shared.await
    }

    /// Wraps `fetcher` so that, on settle, the in-flight entry is removed
    /// (unconditionally) and a success is written to the TTL cache.
    fn settle_into_cache<F>(&self, key: String, registered: bool, fetcher: F) -> SharedFetch<T>
    where
        F: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        async move {
            let result = fetcher.await;
            let mut guard = inner.lock().expect("request cache lock poisoned");
            if registered {
                guard.in_flight.remove(&key);
            }
            match &result {
                Ok(value) => {
                    guard.cache.insert(
                        key,
                        CacheEntry {
                            value: value.clone(),
                            stored_at: Instant::now(),
                        },
                    );
                }
                Err(e) => {
                    tracing::debug!(key, error = %e, "fetch settled with error");
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Drops every cached value. In-flight requests are left alone.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("request cache lock poisoned");
        inner.cache.clear();
    }
}
