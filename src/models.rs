// Wire-level data structures for the marketplace catalog API

use serde::{Deserialize, Serialize};

// A single car listing as returned by the catalog search endpoint.
// Most fields are optional: partner-sourced inventory is frequently missing
// detail fields, and the storefront renders whatever is present.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub id: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub variant: Option<String>,
    pub year: Option<u32>,
    pub price: Option<u64>,
    pub km_driven: Option<u64>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub owner: Option<String>,
    pub body_type: Option<String>,
    pub color: Option<String>,
    pub seats: Option<u32>,
    pub category: Option<String>,
    pub seller_type: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

// Response shape of GET /api/cars/public
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub data: Vec<Car>,
    pub meta: SearchMeta,
}

// One selectable value of a facet, with its inventory count
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

impl FacetCount {
    pub fn new(value: impl Into<String>, count: u64) -> Self {
        FacetCount {
            value: value.into(),
            count,
        }
    }
}

// Brand entry carries its models so the UI can offer "brand-model" selection
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BrandCount {
    pub name: String,
    pub count: u64,
    #[serde(default)]
    pub models: Vec<FacetCount>,
}

// Aggregate facet counts, response of GET /api/cars/public/filter-counts
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FilterCounts {
    #[serde(default)]
    pub brands: Vec<BrandCount>,
    #[serde(default)]
    pub body_types: Vec<FacetCount>,
    #[serde(default)]
    pub fuel_types: Vec<FacetCount>,
    #[serde(default)]
    pub transmission_types: Vec<FacetCount>,
    #[serde(default)]
    pub colors: Vec<FacetCount>,
    #[serde(default)]
    pub seats: Vec<FacetCount>,
    #[serde(default)]
    pub owners: Vec<FacetCount>,
    #[serde(default)]
    pub seller_types: Vec<FacetCount>,
}

// The catalog wraps the counts payload in a success envelope
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FilterCountsEnvelope {
    pub success: bool,
    pub data: FilterCounts,
}
