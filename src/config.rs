// Configuration loading via the 'config' crate and 'dotenv'

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_address: String,
    /// Base URL of the marketplace catalog API, e.g. "https://api.example-motors.in"
    pub catalog_base_url: String,
    /// Results per page requested from the catalog search endpoint.
    pub page_size: u32,
    /// Quiet period before a filter change triggers a refetch, in milliseconds.
    pub search_debounce_ms: u64,
    /// How long a search response may be served from cache, in seconds.
    pub search_cache_ttl_secs: u64,
    /// How long the facet-counts payload stays fresh, in seconds.
    pub filter_counts_ttl_secs: u64,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Config::builder()
            // Defaults mirror what the storefront frontend assumed
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("catalog_base_url", "http://127.0.0.1:8080")?
            .set_default("page_size", 20)?
            .set_default("search_debounce_ms", 300)?
            .set_default("search_cache_ttl_secs", 30)?
            .set_default("filter_counts_ttl_secs", 240)?
            // Load from a configuration file (e.g., config.toml)
            .add_source(File::with_name("config").required(false))
            // Load from environment variables (e.g., APP_CATALOG_BASE_URL)
            .add_source(Environment::with_prefix("APP"));

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}
