use rent_catalog::config::CatalogConfig;
use rent_catalog::handlers::{self, AppState};
use rent_catalog::PropertyCatalog;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - The property catalog (fixtures, cache, simulated sources).
/// - HTTP routes and middleware.
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rent_catalog=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = CatalogConfig::from_env()?;
    let port = config.port;

    // The one catalog instance for the process; handlers get it through AppState
    let catalog = Arc::new(PropertyCatalog::with_builtin_listings(config)?);
    tracing::info!(
        "Catalog initialized (sources: {})",
        catalog.source_names().join(", ")
    );

    let app_state = Arc::new(AppState::new(catalog));
    let app = handlers::router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
