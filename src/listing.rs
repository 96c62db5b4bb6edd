// The listing session store: owns the filter criteria, debounces refetches,
// and applies replace/append pagination semantics to the in-memory listing.
//
// Update cycle: a criteria mutation is applied synchronously (page reset to
// 1, listing cleared), then a debounce task waits out the quiet period and
// fetches page 1 -- unless a newer mutation superseded it. Every fetch
// carries the generation current at issue time; a response arriving for an
// older generation is discarded instead of clobbering newer state.

use crate::{
    catalog::CatalogBackend,
    filters::{canonical_key, ActiveFilter, DeepLinkParams, FilterCriteria, FilterPatch},
    models::{Car, SearchResponse},
    request_cache::{RequestCache, RequestOptions},
};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl Pagination {
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Immutable view of the listing state, published to renderers on every
/// change through a watch channel.
#[derive(Debug, Clone, Default)]
pub struct ListingSnapshot {
    pub cars: Vec<Car>,
    pub total_count: u64,
    pub pagination: Pagination,
    pub loading: bool,
    pub loading_more: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub debounce: Duration,
    pub page_size: u32,
    pub search_cache_ttl: Duration,
}

impl Default for ListingConfig {
    fn default() -> Self {
        ListingConfig {
            debounce: Duration::from_millis(300),
            page_size: 20,
            search_cache_ttl: Duration::from_secs(30),
        }
    }
}

struct ListingState {
    criteria: FilterCriteria,
    cars: Vec<Car>,
    total_count: u64,
    page: u32,
    total_pages: u32,
    loading: bool,
    loading_more: bool,
    error: Option<String>,
    // Bumped on every criteria change; stale fetches compare against it
    generation: u64,
}

struct StoreInner {
    state: Mutex<ListingState>,
    snapshot_tx: watch::Sender<ListingSnapshot>,
    backend: Arc<dyn CatalogBackend>,
    cache: RequestCache<Arc<SearchResponse>>,
    config: ListingConfig,
}

/// Cheap-clone handle; every clone shares the same session state, like the
/// context provider the listing widgets all hang off.
#[derive(Clone)]
pub struct ListingStore {
    inner: Arc<StoreInner>,
}

impl ListingStore {
    pub fn new(backend: Arc<dyn CatalogBackend>, config: ListingConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(ListingSnapshot::default());
        ListingStore {
            inner: Arc::new(StoreInner {
                state: Mutex::new(ListingState {
                    criteria: FilterCriteria::default(),
                    cars: Vec::new(),
                    total_count: 0,
                    page: 1,
                    total_pages: 0,
                    loading: false,
                    loading_more: false,
                    error: None,
                    generation: 0,
                }),
                snapshot_tx,
                backend,
                cache: RequestCache::new(config.search_cache_ttl),
                config,
            }),
        }
    }

    /// Current state; renderers that want a stream instead use
    /// [`subscribe`](Self::subscribe).
    pub fn snapshot(&self) -> ListingSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListingSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.inner.lock_state().criteria.clone()
    }

    /// Pure chip derivation over the current criteria.
    pub fn active_filters(&self) -> Vec<ActiveFilter> {
        self.inner.lock_state().criteria.active_filters()
    }

    /// Merges a partial criteria update. The listing is cleared and the
    /// page reset immediately so stale results never show under new
    /// filters; the refetch itself waits out the debounce window.
    pub fn update_filters(&self, patch: FilterPatch) {
        self.mutate_criteria(|criteria| criteria.apply(patch));
    }

    /// Removes one active-filter chip. Same debounced refetch path as any
    /// other criteria change.
    pub fn remove_filter(&self, chip: ActiveFilter) {
        self.mutate_criteria(|criteria| criteria.remove_filter(&chip));
    }

    /// Overwrites the deep-linkable criteria subset from URL parameters
    /// and fetches immediately (no debounce; this is a navigation, not a
    /// slider drag).
    pub async fn apply_deep_link(&self, params: &DeepLinkParams) {
        let generation = {
            let mut state = self.inner.lock_state();
            state.criteria.apply_deep_link(params);
            state.page = 1;
            state.cars.clear();
            state.generation += 1;
            state.loading = true;
            self.inner.publish(&state);
            state.generation
        };
        self.inner.fetch_page(generation, 1, false).await;
    }

    /// Initial page-1 fetch for the current criteria (listing mount).
    pub async fn refresh(&self) {
        let generation = {
            let mut state = self.inner.lock_state();
            state.generation += 1;
            state.page = 1;
            state.loading = true;
            self.inner.publish(&state);
            state.generation
        };
        self.inner.fetch_page(generation, 1, false).await;
    }

    /// Fetches the next page and appends it. No-op while a fetch is
    /// already running or when the last page has been reached.
    pub async fn load_more(&self) {
        let (generation, next_page) = {
            let mut state = self.inner.lock_state();
            let exhausted = state.page >= state.total_pages;
            if state.loading || state.loading_more || exhausted {
                return;
            }
            state.loading_more = true;
            self.inner.publish(&state);
            (state.generation, state.page + 1)
        };
        self.inner.fetch_page(generation, next_page, true).await;
    }

    fn mutate_criteria(&self, mutate: impl FnOnce(&mut FilterCriteria)) {
        let generation = {
            let mut state = self.inner.lock_state();
            mutate(&mut state.criteria);
            // A filter change invalidates prior pagination
            state.page = 1;
            state.cars.clear();
            state.generation += 1;
            state.loading = true;
            self.inner.publish(&state);
            state.generation
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.config.debounce).await;
            if inner.lock_state().generation != generation {
                // Superseded within the debounce window; the newest
                // mutation's task will do the fetch
                return;
            }
            inner.fetch_page(generation, 1, false).await;
        });
    }
}

impl StoreInner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, ListingState> {
        self.state.lock().expect("listing state lock poisoned")
    }

    async fn fetch_page(&self, generation: u64, page: u32, append: bool) {
        let (mut params, key) = {
            let state = self.lock_state();
            let params = state.criteria.to_query(page, self.config.page_size);
            let key = canonical_key(&params);
            (params, key)
        };

        let opts = if append {
            // Cache-busting stamp + force refresh: a load-more must never
            // be served from (or merged into) the page-1 request
            params.push((
                "_ts".to_string(),
                chrono::Utc::now().timestamp_millis().to_string(),
            ));
            params.push(("forceRefresh".to_string(), "true".to_string()));
            RequestOptions::force_refresh()
        } else {
            RequestOptions::default()
        };

        let backend = Arc::clone(&self.backend);
        let result = self
            .cache
            .request(&key, opts, async move {
                backend.search(&params).await.map(Arc::new)
            })
            .await;

        let mut state = self.lock_state();
        if state.generation != generation {
            tracing::debug!(generation, page, "Discarding stale search response");
            return;
        }

        match result {
            Ok(response) => {
                let limit = if response.meta.limit > 0 {
                    response.meta.limit
                } else {
                    self.config.page_size
                };
                state.total_count = response.meta.total;
                state.total_pages = response.meta.total.div_ceil(limit as u64) as u32;
                state.page = page;
                if append {
                    state.cars.extend(response.data.iter().cloned());
                } else {
                    state.cars = response.data.clone();
                }
                state.error = None;
            }
            Err(e) => {
                if append {
                    // Partial-failure tolerance: a failed load-more leaves
                    // what's already rendered intact
                    tracing::warn!(error = %e, page, "Load-more failed, keeping current listing");
                } else {
                    tracing::error!(error = %e, "Search fetch failed, clearing listing");
                    state.cars.clear();
                    state.total_count = 0;
                    state.total_pages = 0;
                    state.error = Some("Unable to load cars. Please try again.".to_string());
                }
            }
        }
        state.loading = false;
        state.loading_more = false;
        self.publish(&state);
    }

    fn publish(&self, state: &ListingState) {
        self.snapshot_tx.send_replace(ListingSnapshot {
            cars: state.cars.clone(),
            total_count: state.total_count,
            pagination: Pagination {
                page: state.page,
                limit: self.config.page_size,
                total_pages: state.total_pages,
            },
            loading: state.loading,
            loading_more: state.loading_more,
            error: state.error.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::{Car, FilterCounts, SearchMeta};
    use axum::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};

    const TOTAL_ALL: u64 = 1726;
    const TOTAL_HONDA: u64 = 87;

    struct FakeCatalog {
        calls: Mutex<Vec<Vec<(String, String)>>>,
        fail_pages: Mutex<HashSet<u32>>,
        // Per-brand artificial latency, applied when "make" matches
        slow_make: Mutex<Option<(String, u64)>>,
        latency_ms: AtomicU64,
    }

    impl FakeCatalog {
        fn new() -> Arc<Self> {
            Arc::new(FakeCatalog {
                calls: Mutex::new(Vec::new()),
                fail_pages: Mutex::new(HashSet::new()),
                slow_make: Mutex::new(None),
                latency_ms: AtomicU64::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        }
    }

    #[async_trait]
    impl CatalogBackend for FakeCatalog {
        async fn search(
            &self,
            params: &[(String, String)],
        ) -> Result<SearchResponse, FetchError> {
            self.calls.lock().unwrap().push(params.to_vec());

            let page: u32 = Self::param(params, "page").unwrap().parse().unwrap();
            let limit: u32 = Self::param(params, "limit").unwrap().parse().unwrap();
            let make = Self::param(params, "make").map(str::to_string);

            let mut delay = self.latency_ms.load(Ordering::SeqCst);
            if let Some((slow, ms)) = self.slow_make.lock().unwrap().clone() {
                if make.as_deref() == Some(slow.as_str()) {
                    delay = ms;
                }
            }
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            if self.fail_pages.lock().unwrap().contains(&page) {
                return Err(FetchError::new("simulated page failure"));
            }

            let total = match make.as_deref() {
                Some("Honda") => TOTAL_HONDA,
                _ => TOTAL_ALL,
            };
            let data = (0..limit)
                .map(|i| Car {
                    id: format!("{}-p{}-{}", make.as_deref().unwrap_or("all"), page, i),
                    make: make.clone(),
                    ..Default::default()
                })
                .collect();
            Ok(SearchResponse {
                data,
                meta: SearchMeta { total, page, limit },
            })
        }

        async fn filter_counts(&self) -> Result<FilterCounts, FetchError> {
            unimplemented!("not exercised here")
        }

        async fn car(&self, _id: &str) -> Result<Car, FetchError> {
            unimplemented!("not exercised here")
        }
    }

    // Lets spawned debounce/fetch tasks run to completion
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_filter_changes_coalesce_into_one_fetch() {
        let catalog = FakeCatalog::new();
        let store = ListingStore::new(catalog.clone(), ListingConfig::default());

        store.update_filters(FilterPatch::brands(["Honda"]));
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.update_filters(FilterPatch::brands(["Toyota"]));
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.update_filters(FilterPatch::brands(["Maruti Suzuki"]));

        tokio::time::sleep(Duration::from_millis(400)).await;
        settle().await;

        // Only the last-settled criteria snapshot went out
        let calls = catalog.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(FakeCatalog::param(&calls[0], "make"), Some("Maruti Suzuki"));
    }

    #[tokio::test(start_paused = true)]
    async fn filter_change_resets_pagination_and_clears_listing() {
        let catalog = FakeCatalog::new();
        let store = ListingStore::new(catalog.clone(), ListingConfig::default());

        store.refresh().await;
        store.load_more().await;
        let before = store.snapshot();
        assert_eq!(before.pagination.page, 2);
        assert_eq!(before.cars.len(), 40);

        store.update_filters(FilterPatch::brands(["Honda"]));
        let after = store.snapshot();
        assert_eq!(after.pagination.page, 1);
        assert!(after.cars.is_empty());
        assert!(after.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_filter_application() {
        let catalog = FakeCatalog::new();
        let store = ListingStore::new(catalog.clone(), ListingConfig::default());

        // Initial unfiltered load
        store.refresh().await;
        let initial = store.snapshot();
        assert_eq!(initial.total_count, TOTAL_ALL);
        assert_eq!(initial.cars.len(), 20);
        assert_eq!(initial.pagination.page, 1);

        // Applying a brand clears the list and issues a make=Honda fetch
        store.update_filters(FilterPatch::brands(["Honda"]));
        assert!(store.snapshot().cars.is_empty());
        tokio::time::sleep(Duration::from_millis(400)).await;
        settle().await;

        let filtered = store.snapshot();
        assert_eq!(filtered.total_count, TOTAL_HONDA);
        assert_eq!(filtered.pagination.page, 1);
        assert!(!filtered.loading);

        let calls = catalog.calls.lock().unwrap();
        let last = calls.last().unwrap();
        assert_eq!(FakeCatalog::param(last, "make"), Some("Honda"));
        drop(calls);

        let chips = store.active_filters();
        assert!(chips.contains(&ActiveFilter::Brand("Honda".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_load_more_keeps_existing_listing() {
        let catalog = FakeCatalog::new();
        let store = ListingStore::new(catalog.clone(), ListingConfig::default());

        store.refresh().await;
        assert_eq!(store.snapshot().cars.len(), 20);

        catalog.fail_pages.lock().unwrap().insert(2);
        store.load_more().await;

        let snap = store.snapshot();
        assert_eq!(snap.cars.len(), 20);
        assert!(!snap.loading_more);
        // The page-1 state is still usable, so no error banner either
        assert!(snap.error.is_none());
        assert_eq!(snap.pagination.page, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_load_more_appends_without_dedup() {
        let catalog = FakeCatalog::new();
        let store = ListingStore::new(catalog.clone(), ListingConfig::default());

        store.refresh().await;
        store.load_more().await;

        let snap = store.snapshot();
        assert_eq!(snap.cars.len(), 40);
        assert_eq!(snap.pagination.page, 2);
        assert!(snap.pagination.has_more());

        // The append carried cache-busting fields
        let calls = catalog.calls.lock().unwrap();
        assert!(FakeCatalog::param(&calls[1], "forceRefresh").is_some());
        assert!(FakeCatalog::param(&calls[1], "_ts").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_initial_fetch_clears_listing_and_sets_error() {
        let catalog = FakeCatalog::new();
        catalog.fail_pages.lock().unwrap().insert(1);
        let store = ListingStore::new(catalog.clone(), ListingConfig::default());

        store.refresh().await;
        let snap = store.snapshot();
        assert!(snap.cars.is_empty());
        assert_eq!(snap.total_count, 0);
        assert!(snap.error.is_some());
        assert!(!snap.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_is_discarded_on_arrival() {
        let catalog = FakeCatalog::new();
        let store = ListingStore::new(catalog.clone(), ListingConfig::default());

        // The Honda fetch is slow; it will resolve after the follow-up
        // unfiltered fetch has already applied
        *catalog.slow_make.lock().unwrap() = Some(("Honda".to_string(), 1000));

        store.update_filters(FilterPatch::brands(["Honda"]));
        // Debounce elapses at 300ms, Honda fetch in flight until ~1300ms
        tokio::time::sleep(Duration::from_millis(500)).await;

        store.update_filters(FilterPatch::brands(Vec::<String>::new()));
        tokio::time::sleep(Duration::from_millis(2000)).await;
        settle().await;

        // The slow Honda response arrived last but carried a stale
        // generation; the unfiltered totals must win
        let snap = store.snapshot();
        assert_eq!(snap.total_count, TOTAL_ALL);
        assert_eq!(catalog.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn load_more_is_a_noop_when_exhausted() {
        let catalog = FakeCatalog::new();
        let store = ListingStore::new(
            catalog.clone(),
            ListingConfig {
                page_size: 2000, // one page covers the whole inventory
                ..Default::default()
            },
        );

        store.refresh().await;
        assert!(!store.snapshot().pagination.has_more());
        store.load_more().await;
        assert_eq!(catalog.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deep_link_fetches_immediately_with_mapped_params() {
        let catalog = FakeCatalog::new();
        let store = ListingStore::new(catalog.clone(), ListingConfig::default());

        store
            .apply_deep_link(&DeepLinkParams {
                make: Some("Honda".to_string()),
                min_price: Some(200_000),
                max_price: Some(900_000),
                ..Default::default()
            })
            .await;

        assert_eq!(catalog.call_count(), 1);
        let calls = catalog.calls.lock().unwrap();
        assert_eq!(FakeCatalog::param(&calls[0], "make"), Some("Honda"));
        assert_eq!(FakeCatalog::param(&calls[0], "minPrice"), Some("200000"));
        drop(calls);
        assert_eq!(store.snapshot().total_count, TOTAL_HONDA);
    }
}
