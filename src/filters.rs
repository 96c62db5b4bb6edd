// Filter criteria owned by the listing session, plus the query-parameter
// derivation sent to the catalog search endpoint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// Price bounds offered by the storefront sliders (in rupees)
pub const DEFAULT_PRICE_MIN: u64 = 100_000;
pub const DEFAULT_PRICE_MAX: u64 = 3_005_000;
pub const DEFAULT_YEAR_MIN: u32 = 2000;
pub const DEFAULT_YEAR_MAX: u32 = 2026;
pub const DEFAULT_KM_MIN: u64 = 0;
pub const DEFAULT_KM_MAX: u64 = 200_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u64,
    pub max: u64,
}

impl PriceRange {
    /// Normalizes an inverted range by pulling `min` down to `max`.
    /// Slider interactions may momentarily cross the handles; we clamp
    /// rather than reject so the UI never shows an impossible range.
    pub fn clamped(self) -> Self {
        if self.min > self.max {
            PriceRange {
                min: self.max,
                max: self.max,
            }
        } else {
            self
        }
    }

    pub fn is_default(&self) -> bool {
        self.min == DEFAULT_PRICE_MIN && self.max == DEFAULT_PRICE_MAX
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        PriceRange {
            min: DEFAULT_PRICE_MIN,
            max: DEFAULT_PRICE_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: u32,
    pub max: u32,
}

impl YearRange {
    pub fn clamped(self) -> Self {
        if self.min > self.max {
            YearRange {
                min: self.max,
                max: self.max,
            }
        } else {
            self
        }
    }

    pub fn is_default(&self) -> bool {
        self.min == DEFAULT_YEAR_MIN && self.max == DEFAULT_YEAR_MAX
    }
}

impl Default for YearRange {
    fn default() -> Self {
        YearRange {
            min: DEFAULT_YEAR_MIN,
            max: DEFAULT_YEAR_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmRange {
    pub min: u64,
    pub max: u64,
}

impl KmRange {
    pub fn clamped(self) -> Self {
        if self.min > self.max {
            KmRange {
                min: self.max,
                max: self.max,
            }
        } else {
            self
        }
    }

    pub fn is_default(&self) -> bool {
        self.min == DEFAULT_KM_MIN && self.max == DEFAULT_KM_MAX
    }
}

impl Default for KmRange {
    fn default() -> Self {
        KmRange {
            min: DEFAULT_KM_MIN,
            max: DEFAULT_KM_MAX,
        }
    }
}

// Price segment, single-select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    All,
    MidRange,
    Luxury,
}

impl Category {
    /// Query-parameter value, `None` for the unfiltered default.
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            Category::All => None,
            Category::MidRange => Some("mid-range"),
            Category::Luxury => Some("luxury"),
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Category::All),
            "mid-range" => Some(Category::MidRange),
            "luxury" => Some(Category::Luxury),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::All => "All",
            Category::MidRange => "Mid-Range",
            Category::Luxury => "Luxury",
        }
    }
}

/// The full set of filter criteria for one listing session.
///
/// Facet sets use `BTreeSet` so the derived query parameters (and therefore
/// the request cache keys) are stable regardless of toggle order. An empty
/// set means "no constraint", never "match nothing".
///
/// Model selections are stored as `"brand-model"` composite keys because the
/// same model name can appear under different brands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub price_range: PriceRange,
    pub selected_brands: BTreeSet<String>,
    pub selected_models: BTreeSet<String>,
    pub year_range: YearRange,
    pub km_range: KmRange,
    pub fuel_types: BTreeSet<String>,
    pub transmissions: BTreeSet<String>,
    pub owners: BTreeSet<String>,
    pub body_types: BTreeSet<String>,
    pub colors: BTreeSet<String>,
    pub seats: BTreeSet<String>,
    pub features: BTreeSet<String>,
    pub seller_type: Option<String>,
    pub category: Category,
    pub search_query: String,
}

/// A partial update; `None` fields leave the current value untouched.
/// Set-valued fields are replaced wholesale when present, matching how the
/// filter widgets hand over their full selection on every change.
#[derive(Debug, Clone, Default)]
pub struct FilterPatch {
    pub price_range: Option<PriceRange>,
    pub selected_brands: Option<BTreeSet<String>>,
    pub selected_models: Option<BTreeSet<String>>,
    pub year_range: Option<YearRange>,
    pub km_range: Option<KmRange>,
    pub fuel_types: Option<BTreeSet<String>>,
    pub transmissions: Option<BTreeSet<String>>,
    pub owners: Option<BTreeSet<String>>,
    pub body_types: Option<BTreeSet<String>>,
    pub colors: Option<BTreeSet<String>>,
    pub seats: Option<BTreeSet<String>>,
    pub features: Option<BTreeSet<String>>,
    pub seller_type: Option<Option<String>>,
    pub category: Option<Category>,
    pub search_query: Option<String>,
}

impl FilterPatch {
    pub fn brands<I, S>(brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterPatch {
            selected_brands: Some(brands.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn price(min: u64, max: u64) -> Self {
        FilterPatch {
            price_range: Some(PriceRange { min, max }),
            ..Default::default()
        }
    }

    pub fn search(query: impl Into<String>) -> Self {
        FilterPatch {
            search_query: Some(query.into()),
            ..Default::default()
        }
    }
}

/// One active filter, rendered as a removable chip above the listing.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveFilter {
    Search(String),
    Price(PriceRange),
    Brand(String),
    Model(String),
    Year(YearRange),
    Km(KmRange),
    Fuel(String),
    Transmission(String),
    Owner(String),
    BodyType(String),
    Color(String),
    Seats(String),
    Feature(String),
    SellerType(String),
    Category(Category),
}

impl ActiveFilter {
    pub fn label(&self) -> String {
        match self {
            ActiveFilter::Search(q) => format!("\"{}\"", q),
            ActiveFilter::Price(r) => format!("₹{} - ₹{}", r.min, r.max),
            ActiveFilter::Brand(b) => b.clone(),
            // Composite key "brand-model"; show just the model part
            ActiveFilter::Model(m) => m
                .split_once('-')
                .map(|(_, model)| model.to_string())
                .unwrap_or_else(|| m.clone()),
            ActiveFilter::Year(r) => format!("{} - {}", r.min, r.max),
            ActiveFilter::Km(r) => format!("{} - {} km", r.min, r.max),
            ActiveFilter::Fuel(v)
            | ActiveFilter::Transmission(v)
            | ActiveFilter::Owner(v)
            | ActiveFilter::BodyType(v)
            | ActiveFilter::Color(v)
            | ActiveFilter::Feature(v)
            | ActiveFilter::SellerType(v) => v.clone(),
            ActiveFilter::Seats(v) => format!("{} Seater", v),
            ActiveFilter::Category(c) => c.label().to_string(),
        }
    }
}

// Query-string parameters accepted for deep links into a pre-filtered
// listing (e.g. "Browse by brand" tiles elsewhere on the site).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepLinkParams {
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub fuel: Option<String>,
    pub transmission: Option<String>,
    /// Formatted as "min-max", e.g. "2018-2022"
    pub year: Option<String>,
    pub category: Option<String>,
    pub body_type: Option<String>,
    /// Comma-separated brand names
    pub make: Option<String>,
    pub page: Option<u32>,
    pub search: Option<String>,
}

fn split_csv(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl FilterCriteria {
    /// Merges a partial update. Ranges are clamped so `min <= max` always
    /// holds after any single interaction.
    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(range) = patch.price_range {
            self.price_range = range.clamped();
        }
        if let Some(brands) = patch.selected_brands {
            self.selected_brands = brands;
            // Drop model selections whose brand is no longer selected
            if !self.selected_brands.is_empty() {
                let brands = self.selected_brands.clone();
                self.selected_models.retain(|key| {
                    key.split_once('-')
                        .map(|(brand, _)| brands.contains(brand))
                        .unwrap_or(false)
                });
            }
        }
        if let Some(models) = patch.selected_models {
            self.selected_models = models;
        }
        if let Some(range) = patch.year_range {
            self.year_range = range.clamped();
        }
        if let Some(range) = patch.km_range {
            self.km_range = range.clamped();
        }
        if let Some(v) = patch.fuel_types {
            self.fuel_types = v;
        }
        if let Some(v) = patch.transmissions {
            self.transmissions = v;
        }
        if let Some(v) = patch.owners {
            self.owners = v;
        }
        if let Some(v) = patch.body_types {
            self.body_types = v;
        }
        if let Some(v) = patch.colors {
            self.colors = v;
        }
        if let Some(v) = patch.seats {
            self.seats = v;
        }
        if let Some(v) = patch.features {
            self.features = v;
        }
        if let Some(v) = patch.seller_type {
            self.seller_type = v;
        }
        if let Some(v) = patch.category {
            self.category = v;
        }
        if let Some(v) = patch.search_query {
            self.search_query = v;
        }
    }

    /// Overwrites the deep-linkable subset of criteria from URL parameters.
    /// Only the keys the query-string contract names are touched.
    pub fn apply_deep_link(&mut self, params: &DeepLinkParams) {
        if params.min_price.is_some() || params.max_price.is_some() {
            self.price_range = PriceRange {
                min: params.min_price.unwrap_or(DEFAULT_PRICE_MIN),
                max: params.max_price.unwrap_or(DEFAULT_PRICE_MAX),
            }
            .clamped();
        }
        if let Some(ref fuel) = params.fuel {
            self.fuel_types = split_csv(fuel);
        }
        if let Some(ref transmission) = params.transmission {
            self.transmissions = split_csv(transmission);
        }
        if let Some(ref year) = params.year {
            if let Some((min, max)) = year.split_once('-') {
                if let (Ok(min), Ok(max)) = (min.trim().parse(), max.trim().parse()) {
                    self.year_range = YearRange { min, max }.clamped();
                }
            }
        }
        if let Some(ref category) = params.category {
            if let Some(parsed) = Category::from_param(category) {
                self.category = parsed;
            }
        }
        if let Some(ref body_type) = params.body_type {
            self.body_types = split_csv(body_type);
        }
        if let Some(ref make) = params.make {
            self.selected_brands = split_csv(make);
        }
        if let Some(ref search) = params.search {
            self.search_query = search.clone();
        }
    }

    /// Builds the query parameters for the catalog search endpoint.
    ///
    /// Keys whose value equals the "unset" default are omitted, which keeps
    /// request URLs minimal and the cache keys friendly: an untouched slider
    /// produces the same key as a never-rendered one.
    pub fn to_query(&self, page: u32, limit: u32) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("page".into(), page.to_string()),
            ("limit".into(), limit.to_string()),
        ];

        if !self.search_query.trim().is_empty() {
            params.push(("search".into(), self.search_query.trim().to_string()));
        }
        if !self.price_range.is_default() {
            params.push(("minPrice".into(), self.price_range.min.to_string()));
            params.push(("maxPrice".into(), self.price_range.max.to_string()));
        }
        if !self.selected_brands.is_empty() {
            params.push(("make".into(), join_set(&self.selected_brands)));
        }
        if !self.selected_models.is_empty() {
            // Strip the disambiguating brand prefix before it goes on the wire
            let models: Vec<&str> = self
                .selected_models
                .iter()
                .map(|key| key.split_once('-').map(|(_, m)| m).unwrap_or(key))
                .collect();
            params.push(("model".into(), models.join(",")));
        }
        if !self.year_range.is_default() {
            params.push((
                "year".into(),
                format!("{}-{}", self.year_range.min, self.year_range.max),
            ));
        }
        if !self.km_range.is_default() {
            params.push((
                "km".into(),
                format!("{}-{}", self.km_range.min, self.km_range.max),
            ));
        }
        if !self.fuel_types.is_empty() {
            params.push(("fuel".into(), join_set(&self.fuel_types)));
        }
        if !self.transmissions.is_empty() {
            params.push(("transmission".into(), join_set(&self.transmissions)));
        }
        if !self.owners.is_empty() {
            params.push(("owner".into(), join_set(&self.owners)));
        }
        if !self.body_types.is_empty() {
            params.push(("bodyType".into(), join_set(&self.body_types)));
        }
        if !self.colors.is_empty() {
            params.push(("color".into(), join_set(&self.colors)));
        }
        if !self.seats.is_empty() {
            params.push(("seats".into(), join_set(&self.seats)));
        }
        if !self.features.is_empty() {
            params.push(("features".into(), join_set(&self.features)));
        }
        if let Some(category) = self.category.as_param() {
            params.push(("category".into(), category.to_string()));
        }
        if let Some(ref seller_type) = self.seller_type {
            params.push(("sellerType".into(), seller_type.clone()));
        }

        params
    }

    /// Flat ordered list of chips for display. Pure derivation; removing a
    /// chip is routed back through [`FilterCriteria::remove_filter`].
    pub fn active_filters(&self) -> Vec<ActiveFilter> {
        let mut chips = Vec::new();

        if !self.search_query.trim().is_empty() {
            chips.push(ActiveFilter::Search(self.search_query.trim().to_string()));
        }
        if !self.price_range.is_default() {
            chips.push(ActiveFilter::Price(self.price_range));
        }
        chips.extend(self.selected_brands.iter().cloned().map(ActiveFilter::Brand));
        chips.extend(self.selected_models.iter().cloned().map(ActiveFilter::Model));
        if !self.year_range.is_default() {
            chips.push(ActiveFilter::Year(self.year_range));
        }
        if !self.km_range.is_default() {
            chips.push(ActiveFilter::Km(self.km_range));
        }
        chips.extend(self.fuel_types.iter().cloned().map(ActiveFilter::Fuel));
        chips.extend(
            self.transmissions
                .iter()
                .cloned()
                .map(ActiveFilter::Transmission),
        );
        chips.extend(self.owners.iter().cloned().map(ActiveFilter::Owner));
        chips.extend(self.body_types.iter().cloned().map(ActiveFilter::BodyType));
        chips.extend(self.colors.iter().cloned().map(ActiveFilter::Color));
        chips.extend(self.seats.iter().cloned().map(ActiveFilter::Seats));
        chips.extend(self.features.iter().cloned().map(ActiveFilter::Feature));
        if let Some(ref seller_type) = self.seller_type {
            chips.push(ActiveFilter::SellerType(seller_type.clone()));
        }
        if self.category != Category::All {
            chips.push(ActiveFilter::Category(self.category));
        }

        chips
    }

    /// Clears the piece of state a removed chip refers to.
    pub fn remove_filter(&mut self, chip: &ActiveFilter) {
        match chip {
            ActiveFilter::Search(_) => self.search_query.clear(),
            ActiveFilter::Price(_) => self.price_range = PriceRange::default(),
            ActiveFilter::Brand(brand) => {
                self.selected_brands.remove(brand);
                // Models of a removed brand go with it
                self.selected_models
                    .retain(|key| key.split_once('-').map(|(b, _)| b != brand).unwrap_or(true));
            }
            ActiveFilter::Model(model) => {
                self.selected_models.remove(model);
            }
            ActiveFilter::Year(_) => self.year_range = YearRange::default(),
            ActiveFilter::Km(_) => self.km_range = KmRange::default(),
            ActiveFilter::Fuel(v) => {
                self.fuel_types.remove(v);
            }
            ActiveFilter::Transmission(v) => {
                self.transmissions.remove(v);
            }
            ActiveFilter::Owner(v) => {
                self.owners.remove(v);
            }
            ActiveFilter::BodyType(v) => {
                self.body_types.remove(v);
            }
            ActiveFilter::Color(v) => {
                self.colors.remove(v);
            }
            ActiveFilter::Seats(v) => {
                self.seats.remove(v);
            }
            ActiveFilter::Feature(v) => {
                self.features.remove(v);
            }
            ActiveFilter::SellerType(_) => self.seller_type = None,
            ActiveFilter::Category(_) => self.category = Category::All,
        }
    }
}

fn join_set(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Stable cache/dedup key for a parameter list. Volatile, cache-busting
/// fields never participate so a forced refresh still maps to the same
/// logical request.
pub fn canonical_key(params: &[(String, String)]) -> String {
    let mut filtered: Vec<&(String, String)> = params
        .iter()
        .filter(|(k, _)| k != "_ts" && k != "forceRefresh")
        .collect();
    filtered.sort();
    filtered
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}
