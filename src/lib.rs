// carfront: the listing/filter synchronization engine of a used-car
// marketplace storefront, plus a thin HTTP gateway over the catalog API.
//
// The stores (ListingStore, FilterDataStore) are the embeddable client
// engine; the gateway routes expose the same fetch/cache path as stateless
// endpoints.

use axum::extract::FromRef;
use std::sync::Arc;

pub mod catalog;
pub mod config;
pub mod error;
pub mod filter_data;
pub mod filters;
pub mod listing;
pub mod loan;
pub mod models;
pub mod request_cache;
pub mod routes;

use catalog::CatalogBackend;
use config::Settings;
use filter_data::FilterDataStore;
use models::SearchResponse;
use request_cache::RequestCache;

// Shared application state for the gateway.
//
// Everything here is constructed once at bootstrap and handed to the
// router; nothing is module-level static, so tests can build isolated
// instances without cross-test leakage.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub catalog: Arc<dyn CatalogBackend>,
    pub search_cache: RequestCache<Arc<SearchResponse>>,
    pub filter_data: Arc<FilterDataStore>,
}
