use anyhow::{Context, Result};
use carfront::{
    catalog::HttpCatalog, config::Settings, filter_data::FilterDataStore,
    request_cache::RequestCache, routes, AppState,
};
use reqwest::Client;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carfront=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    tracing::info!("Initializing carfront gateway...");

    // Load configuration
    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    let settings = Arc::new(settings);

    // Shared reqwest client for all catalog calls
    let http_client = Arc::new(
        Client::builder()
            .user_agent(concat!("carfront/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build shared reqwest client")?,
    );
    tracing::info!("Shared HTTP client created.");

    let catalog = Arc::new(HttpCatalog::new(
        Arc::clone(&http_client),
        settings.catalog_base_url.clone(),
    ));

    let app_state = AppState {
        settings: Arc::clone(&settings),
        catalog: catalog.clone(),
        search_cache: RequestCache::new(Duration::from_secs(settings.search_cache_ttl_secs)),
        filter_data: Arc::new(FilterDataStore::new(
            catalog,
            Duration::from_secs(settings.filter_counts_ttl_secs),
        )),
    };

    let app = routes::create_router(app_state)
        .layer(TraceLayer::new_for_http());

    // Parse the server address from settings
    let addr: SocketAddr = settings
        .server_address
        .parse()
        .with_context(|| {
            format!(
                "Invalid server address format in configuration ('{}')",
                settings.server_address
            )
        })?;

    // Create a TCP listener
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => {
            tracing::info!("Server listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    // Run the server
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
