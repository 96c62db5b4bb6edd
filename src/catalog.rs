// Client for the marketplace catalog REST API (search, facet counts,
// car detail). The backend is behind a trait so the stores can be driven
// by a fake catalog in tests.

use crate::{
    error::FetchError,
    models::{Car, FilterCounts, FilterCountsEnvelope, SearchResponse},
};
use anyhow::{Context, Result};
use axum::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// `GET /api/cars/public` with the given query parameters.
    async fn search(&self, params: &[(String, String)]) -> Result<SearchResponse, FetchError>;

    /// `GET /api/cars/public/filter-counts`.
    async fn filter_counts(&self) -> Result<FilterCounts, FetchError>;

    /// `GET /api/cars/public/:id`.
    async fn car(&self, id: &str) -> Result<Car, FetchError>;
}

// Detail responses come in the same success envelope as the counts payload
#[derive(Debug, Deserialize)]
struct CarEnvelope {
    success: bool,
    data: Car,
}

pub struct HttpCatalog {
    client: Arc<Client>,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(client: Arc<Client>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HttpCatalog { client, base_url }
    }

    async fn search_inner(&self, params: &[(String, String)]) -> Result<SearchResponse> {
        let url = format!("{}/api/cars/public", self.base_url);
        tracing::debug!(url, ?params, "Fetching car search page");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .context("Failed to reach catalog search endpoint")?
            .error_for_status()
            .context("Catalog search endpoint returned an error status")?;

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse catalog search response")?;

        tracing::debug!(
            total = body.meta.total,
            page = body.meta.page,
            returned = body.data.len(),
            "Search page fetched"
        );
        Ok(body)
    }

    async fn filter_counts_inner(&self) -> Result<FilterCounts> {
        let url = format!("{}/api/cars/public/filter-counts", self.base_url);
        tracing::debug!(url, "Fetching aggregate facet counts");

        let envelope: FilterCountsEnvelope = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach filter-counts endpoint")?
            .error_for_status()
            .context("Filter-counts endpoint returned an error status")?
            .json()
            .await
            .context("Failed to parse filter-counts response")?;

        if !envelope.success {
            anyhow::bail!("Filter-counts endpoint reported failure");
        }
        Ok(envelope.data)
    }

    async fn car_inner(&self, id: &str) -> Result<Car> {
        let url = format!("{}/api/cars/public/{}", self.base_url, id);
        tracing::debug!(url, "Fetching car detail");

        let envelope: CarEnvelope = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach car detail endpoint")?
            .error_for_status()
            .context("Car detail endpoint returned an error status")?
            .json()
            .await
            .context("Failed to parse car detail response")?;

        if !envelope.success {
            anyhow::bail!("Car detail endpoint reported failure");
        }
        Ok(envelope.data)
    }
}

#[async_trait]
impl CatalogBackend for HttpCatalog {
    async fn search(&self, params: &[(String, String)]) -> Result<SearchResponse, FetchError> {
        self.search_inner(params).await.map_err(FetchError::from)
    }

    async fn filter_counts(&self) -> Result<FilterCounts, FetchError> {
        self.filter_counts_inner().await.map_err(FetchError::from)
    }

    async fn car(&self, id: &str) -> Result<Car, FetchError> {
        self.car_inner(id).await.map_err(FetchError::from)
    }
}
