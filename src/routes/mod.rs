// Route definitions

use axum::{routing::get, Router};

use crate::AppState;

mod api;

pub fn create_router(app_state: AppState) -> Router {
    // Static segments are matched before the :id capture
    let api_router = Router::new()
        .route("/cars", get(api::search_cars))
        .route("/cars/filter-counts", get(api::get_filter_counts))
        .route("/cars/:id", get(api::get_car))
        .route("/emi", get(api::get_emi_quote))
        .with_state(app_state);

    Router::new().nest("/api", api_router)
}
