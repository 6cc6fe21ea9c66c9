use crate::catalog::{with_deadline, PropertyCatalog};
use crate::errors::{CatalogError, ResultExt};
use crate::models::*;
use crate::requests::RequestSequencer;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Header naming the logical request channel for latest-wins searches.
pub const REQUEST_CHANNEL_HEADER: &str = "x-request-channel";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// The catalog every handler queries.
    pub catalog: Arc<PropertyCatalog>,
    /// Tracks the newest search per request channel.
    pub requests: Arc<RequestSequencer>,
    /// Deadline applied to every catalog call.
    pub request_deadline: Duration,
}

impl AppState {
    pub fn new(catalog: Arc<PropertyCatalog>) -> Self {
        let request_deadline = catalog.config().request_deadline;
        Self {
            catalog,
            requests: Arc::new(RequestSequencer::new()),
            request_deadline,
        }
    }
}

/// Builds the HTTP router with tracing, CORS and a body size limit.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/listings/region", get(region_listings))
        .route("/api/v1/listings/search", get(search_listings))
        .route("/api/v1/analytics/:city", get(city_analytics))
        .route("/api/v1/sources", get(all_sources))
        .route("/api/v1/sources/:name/status", put(set_source_status))
        .route("/api/v1/cache", get(cache_stats).delete(clear_cache))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                // Query endpoints take no meaningful bodies
                .layer(RequestBodyLimitLayer::new(64 * 1024))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rent-catalog",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Region query parameters. All four edges are required.
#[derive(Debug, Deserialize)]
pub struct BoundsParams {
    pub north: Option<f64>,
    pub south: Option<f64>,
    pub east: Option<f64>,
    pub west: Option<f64>,
}

impl BoundsParams {
    /// Missing edges are a client error. Inverted edges are not: the
    /// catalog answers those with an empty result.
    fn into_bounds(self) -> Result<RegionBounds, CatalogError> {
        let edge = |value: Option<f64>, name: &str| {
            value.ok_or_else(|| {
                CatalogError::InvalidBounds(format!("Missing '{}' parameter", name))
            })
        };
        Ok(RegionBounds::new(
            edge(self.north, "north")?,
            edge(self.south, "south")?,
            edge(self.east, "east")?,
            edge(self.west, "west")?,
        ))
    }
}

/// GET /api/v1/listings/region
///
/// Listings inside a map viewport, with live rent jitter.
pub async fn region_listings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BoundsParams>,
) -> Result<Json<Vec<ListingRecord>>, CatalogError> {
    let bounds = params.into_bounds()?;
    tracing::info!("GET /listings/region - bounds: {:?}", bounds);

    let listings = with_deadline(
        state.request_deadline,
        "query_by_region",
        state.catalog.query_by_region(bounds),
    )
    .await?;

    Ok(Json(listings))
}

/// GET /api/v1/listings/search
///
/// Criteria search. When the `x-request-channel` header is set, a response
/// overtaken by a newer search on the same channel returns 409.
pub async fn search_listings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(criteria): Query<SearchCriteria>,
) -> Result<Json<Vec<ListingRecord>>, CatalogError> {
    tracing::info!("GET /listings/search - criteria: {:?}", criteria);

    let search = with_deadline(
        state.request_deadline,
        "query_by_criteria",
        state.catalog.query_by_criteria(&criteria),
    );

    let channel = headers
        .get(REQUEST_CHANNEL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let listings = match channel {
        Some(channel) => state
            .requests
            .run_latest(&channel, search)
            .await
            .ok_or_else(|| CatalogError::Superseded(channel.clone()))??,
        None => search.await?,
    };

    Ok(Json(listings))
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub locality: Option<String>,
}

/// GET /api/v1/analytics/:city
///
/// Rent analytics for a city, optionally narrowed by `?locality=`.
pub async fn city_analytics(
    State(state): State<Arc<AppState>>,
    Path(city): Path<String>,
    Query(params): Query<AnalyticsParams>,
) -> Result<Json<RentAnalytics>, CatalogError> {
    tracing::info!("GET /analytics/{} - locality: {:?}", city, params.locality);

    let analytics = with_deadline(
        state.request_deadline,
        "compute_analytics",
        state
            .catalog
            .compute_analytics(&city, params.locality.as_deref()),
    )
    .await?
    .with_context(|| format!("analytics for {}", city))?;

    Ok(Json(analytics))
}

/// GET /api/v1/sources
///
/// Per-aggregator fan-out for a viewport.
pub async fn all_sources(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BoundsParams>,
) -> Result<Json<SourcesSnapshot>, CatalogError> {
    let bounds = params.into_bounds()?;
    tracing::info!("GET /sources - bounds: {:?}", bounds);

    let snapshot = with_deadline(
        state.request_deadline,
        "fetch_all_sources",
        state.catalog.fetch_all_sources(bounds),
    )
    .await?;

    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct SourceStatusRequest {
    pub online: bool,
}

/// PUT /api/v1/sources/:name/status
///
/// Switches a simulated source offline or back online.
pub async fn set_source_status(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<SourceStatusRequest>,
) -> Result<Json<serde_json::Value>, CatalogError> {
    state.catalog.set_source_online(&name, body.online)?;
    Ok(Json(json!({ "source": name, "online": body.online })))
}

/// GET /api/v1/cache
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.catalog.cache_stats().await)
}

/// DELETE /api/v1/cache
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    state.catalog.clear_cache();
    StatusCode::NO_CONTENT
}
