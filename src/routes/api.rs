// Handlers for the storefront gateway API

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use crate::{
    error::AppError,
    filters::{canonical_key, DeepLinkParams, FilterCriteria},
    loan::{LoanAction, LoanState},
    models::{Car, FilterCounts},
    request_cache::RequestOptions,
    AppState,
};
use std::sync::Arc;

// --- Response Wrappers ---

#[derive(Serialize)]
pub struct CountsResponse {
    success: bool,
    data: FilterCounts,
}

#[derive(Serialize)]
pub struct CarResponse {
    success: bool,
    data: Car,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmiQuote {
    selling_price: u64,
    loan_amount: u64,
    down_payment: u64,
    duration_months: u32,
    annual_rate_percent: f64,
    monthly_emi: f64,
    total_interest: f64,
    total_payable: f64,
}

// --- Request Structs ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmiQuery {
    price: u64,
    loan_amount: Option<u64>,
    down_payment: Option<u64>,
    duration_months: Option<u32>,
    annual_rate: Option<f64>,
}

// --- API Handlers ---

/// Car search. Accepts the same deep-link query-string the listing page
/// reads (minPrice, maxPrice, fuel, transmission, year "min-max", category,
/// bodyType, make comma-separated) plus `page` and `search`. Identical
/// concurrent searches collapse into one upstream request.
pub async fn search_cars(
    State(app_state): State<AppState>,
    Query(params): Query<DeepLinkParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let mut criteria = FilterCriteria::default();
    criteria.apply_deep_link(&params);

    let query = criteria.to_query(page, app_state.settings.page_size);
    let key = canonical_key(&query);
    tracing::info!(%key, "Search request");

    let catalog = Arc::clone(&app_state.catalog);
    let response = app_state
        .search_cache
        .request(&key, RequestOptions::default(), async move {
            catalog.search(&query).await.map(Arc::new)
        })
        .await?;

    Ok(Json((*response).clone()))
}

pub async fn get_filter_counts(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    // Degraded rather than failed: widgets render the static brand list
    // with zero counts when the catalog is unreachable
    let counts = app_state.filter_data.counts_or_fallback().await;
    Ok(Json(CountsResponse {
        success: true,
        data: (*counts).clone(),
    }))
}

pub async fn get_car(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(%id, "Car detail request");
    let car = app_state.catalog.car(&id).await?;
    Ok(Json(CarResponse {
        success: true,
        data: car,
    }))
}

/// EMI quote for the detail-page loan widget. Starts from the defaults for
/// the given price (20% down) and applies whichever amounts the caller
/// edited; loan and down payment are reconciled by the reducer so the quote
/// always satisfies loan + down = price.
pub async fn get_emi_quote(
    Query(query): Query<EmiQuery>,
) -> Result<impl IntoResponse, AppError> {
    if query.price == 0 {
        return Err(AppError::BadRequest("price must be greater than zero".into()));
    }

    let mut state = LoanState::for_price(query.price);
    if let Some(loan_amount) = query.loan_amount {
        state = state.reduce(LoanAction::SetLoanAmount(loan_amount));
    }
    if let Some(down_payment) = query.down_payment {
        state = state.reduce(LoanAction::SetDownPayment(down_payment));
    }
    if let Some(duration) = query.duration_months {
        state = state.reduce(LoanAction::SetDurationMonths(duration));
    }
    if let Some(rate) = query.annual_rate {
        state = state.reduce(LoanAction::SetAnnualRate(rate));
    }

    let monthly_emi = state.emi();
    let total_interest = state.total_interest();
    Ok(Json(EmiQuote {
        selling_price: state.selling_price,
        loan_amount: state.loan_amount,
        down_payment: state.down_payment,
        duration_months: state.duration_months,
        annual_rate_percent: state.annual_rate_percent,
        monthly_emi,
        total_interest,
        total_payable: state.loan_amount as f64 + total_interest,
    }))
}
