// Shared store for the aggregate facet-counts payload.
//
// Every filter widget (brand list, body type, fuel, transmission, color,
// seats, owners) reads from this store, so the payload is fetched at most
// once per TTL window no matter how many widgets mount concurrently. The
// deduplication rides on RequestCache: late callers await the in-flight
// fetch directly instead of polling a flag.

use crate::{
    catalog::CatalogBackend,
    error::FetchError,
    models::{BrandCount, FacetCount, FilterCounts},
    request_cache::{RequestCache, RequestOptions},
};
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

const COUNTS_KEY: &str = "filter-counts";

/// Bundled zero-count payload served when the catalog has never answered.
/// The widgets render the brand list without counts rather than nothing.
static FALLBACK_COUNTS: Lazy<Arc<FilterCounts>> = Lazy::new(|| {
    let brands = [
        "Maruti Suzuki",
        "Hyundai",
        "Honda",
        "Tata",
        "Toyota",
        "Mahindra",
        "Kia",
        "Volkswagen",
        "Skoda",
        "Renault",
        "Ford",
        "MG",
    ];
    Arc::new(FilterCounts {
        brands: brands
            .iter()
            .map(|name| BrandCount {
                name: name.to_string(),
                count: 0,
                models: Vec::new(),
            })
            .collect(),
        fuel_types: ["Petrol", "Diesel", "CNG", "Electric"]
            .iter()
            .map(|v| FacetCount::new(*v, 0))
            .collect(),
        transmission_types: ["Manual", "Automatic"]
            .iter()
            .map(|v| FacetCount::new(*v, 0))
            .collect(),
        ..Default::default()
    })
});

pub struct FilterDataStore {
    backend: Arc<dyn CatalogBackend>,
    cache: RequestCache<Arc<FilterCounts>>,
    // Last successfully fetched payload, kept across later failures
    last_good: Mutex<Option<Arc<FilterCounts>>>,
}

impl FilterDataStore {
    pub fn new(backend: Arc<dyn CatalogBackend>, ttl: Duration) -> Self {
        FilterDataStore {
            backend,
            cache: RequestCache::new(ttl),
            last_good: Mutex::new(None),
        }
    }

    /// Returns the counts payload, fetching it if the cached copy is older
    /// than the TTL. Safe to call from any number of consumers at once.
    pub async fn counts(&self) -> Result<Arc<FilterCounts>, FetchError> {
        self.fetch(RequestOptions::default()).await
    }

    /// Bypasses both the cache and any in-flight request. Rarely needed;
    /// not wired to any UI control at the moment.
    pub async fn refetch(&self) -> Result<Arc<FilterCounts>, FetchError> {
        self.fetch(RequestOptions::force_refresh()).await
    }

    /// Like [`counts`](Self::counts), but degrades instead of failing: a
    /// fetch error serves the previous payload, or the bundled zero-count
    /// fallback on a cold start.
    pub async fn counts_or_fallback(&self) -> Arc<FilterCounts> {
        match self.counts().await {
            Ok(counts) => counts,
            Err(e) => {
                let stale = self
                    .last_good
                    .lock()
                    .expect("filter data lock poisoned")
                    .clone();
                match stale {
                    Some(counts) => {
                        tracing::warn!(error = %e, "Facet counts fetch failed, serving stale payload");
                        counts
                    }
                    None => {
                        tracing::warn!(error = %e, "Facet counts fetch failed, serving static fallback");
                        Arc::clone(&FALLBACK_COUNTS)
                    }
                }
            }
        }
    }

    async fn fetch(&self, opts: RequestOptions) -> Result<Arc<FilterCounts>, FetchError> {
        let backend = Arc::clone(&self.backend);
        let result = self
            .cache
            .request(COUNTS_KEY, opts, async move {
                backend.filter_counts().await.map(Arc::new)
            })
            .await;

        if let Ok(ref counts) = result {
            *self.last_good.lock().expect("filter data lock poisoned") = Some(Arc::clone(counts));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeCatalog {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl FakeCatalog {
        fn new() -> Self {
            FakeCatalog {
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl CatalogBackend for FakeCatalog {
        async fn search(
            &self,
            _params: &[(String, String)],
        ) -> Result<crate::models::SearchResponse, FetchError> {
            unimplemented!("not exercised here")
        }

        async fn filter_counts(&self) -> Result<FilterCounts, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(FetchError::new("counts endpoint down"));
            }
            Ok(FilterCounts {
                brands: vec![BrandCount {
                    name: "Honda".to_string(),
                    count: 42,
                    models: Vec::new(),
                }],
                ..Default::default()
            })
        }

        async fn car(&self, _id: &str) -> Result<crate::models::Car, FetchError> {
            unimplemented!("not exercised here")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn payload_is_fetched_once_per_ttl_window() {
        let catalog = Arc::new(FakeCatalog::new());
        let store = FilterDataStore::new(catalog.clone(), Duration::from_secs(240));

        store.counts().await.unwrap();
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(239)).await;
        store.counts().await.unwrap();
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        store.counts().await.unwrap();
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cold_start_failure_serves_the_static_fallback() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.failing.store(true, Ordering::SeqCst);
        let store = FilterDataStore::new(catalog.clone(), Duration::from_secs(240));

        let counts = store.counts_or_fallback().await;
        // Bundled brand list with zero counts
        assert!(!counts.brands.is_empty());
        assert!(counts.brands.iter().all(|b| b.count == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn later_failures_serve_the_last_good_payload() {
        let catalog = Arc::new(FakeCatalog::new());
        let store = FilterDataStore::new(catalog.clone(), Duration::from_secs(240));

        let first = store.counts_or_fallback().await;
        assert_eq!(first.brands[0].count, 42);

        catalog.failing.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(300)).await;

        let second = store.counts_or_fallback().await;
        assert_eq!(second.brands[0].name, "Honda");
        assert_eq!(second.brands[0].count, 42);
    }
}
