/// HTTP surface tests
/// Drives the router in-process; no socket is bound
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use rent_catalog::config::{CatalogConfig, LatencyRange};
use rent_catalog::handlers::{router, AppState, REQUEST_CHANNEL_HEADER};
use rent_catalog::PropertyCatalog;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const GURGAON: &str = "north=28.5&south=28.4&east=77.1&west=77.0";
const INDIA: &str = "north=30&south=10&east=80&west=70";

fn app_with(config: CatalogConfig) -> Router {
    let catalog = Arc::new(PropertyCatalog::with_builtin_listings(config).unwrap());
    router(Arc::new(AppState::new(catalog)))
}

fn app() -> Router {
    app_with(CatalogConfig::instant())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(&app(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_region_listings() {
    let (status, body) = get(&app(), &format!("/api/v1/listings/region?{}", GURGAON)).await;

    assert_eq!(status, StatusCode::OK);
    let listings = body.as_array().unwrap();
    assert_eq!(listings.len(), 3);
    assert!(listings.iter().all(|l| l["city"] == "Gurgaon"));
    // camelCase wire format
    assert!(listings[0].get("propertyType").is_some());
    assert!(listings[0].get("lastUpdated").is_some());
}

#[tokio::test]
async fn test_inverted_region_is_empty_not_error() {
    let uri = "/api/v1/listings/region?north=28.4&south=28.5&east=77.1&west=77.0";
    let (status, body) = get(&app(), uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_missing_edge_is_bad_request() {
    let uri = "/api/v1/listings/region?north=28.5&south=28.4&east=77.1";
    let (status, body) = get(&app(), uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("west"));
}

#[tokio::test]
async fn test_search_listings() {
    let (status, body) = get(&app(), "/api/v1/listings/search?city=gurgaon&minRent=30000").await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["ggn_001", "ggn_002"]);
}

#[tokio::test]
async fn test_search_with_enum_filters() {
    let uri = "/api/v1/listings/search?furnished=semi-furnished&bedrooms=3";
    let (status, body) = get(&app(), uri).await;

    assert_eq!(status, StatusCode::OK);
    let listings = body.as_array().unwrap();
    assert!(listings
        .iter()
        .all(|l| l["furnished"] == "semi-furnished" && l["bedrooms"] == 3));
    assert!(listings.iter().any(|l| l["id"] == "mum_002"));
}

#[tokio::test]
async fn test_analytics() {
    let (status, body) = get(&app(), "/api/v1/analytics/Mumbai").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["averageRent"], 56000);
    assert_eq!(body["medianRent"], 55000);
    assert_eq!(body["totalListings"], 3);
}

#[tokio::test]
async fn test_analytics_with_locality() {
    let (status, body) = get(&app(), "/api/v1/analytics/mumbai?locality=powai").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalListings"], 1);
    assert_eq!(body["averageRent"], 48000);
}

#[tokio::test]
async fn test_analytics_unknown_city() {
    let (status, body) = get(&app(), "/api/v1/analytics/Nowhereville").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No data found for Nowhereville");
}

#[tokio::test]
async fn test_sources_snapshot() {
    let (status, body) = get(&app(), &format!("/api/v1/sources?{}", INDIA)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["combined"].as_array().unwrap().len(), 9);
    for source in ["99acres", "magicbricks", "housing"] {
        assert_eq!(body["bySource"][source].as_array().unwrap().len(), 3);
    }
}

#[tokio::test]
async fn test_source_outage_via_status_route() {
    let app = app();
    let request = Request::put("/api/v1/sources/housing/status")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"online": false}"#))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["online"], false);

    let (status, body) = get(&app, &format!("/api/v1/sources?{}", INDIA)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["combined"].as_array().unwrap().len(), 6);
    assert!(body["bySource"]["housing"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_source_status() {
    let request = Request::put("/api/v1/sources/nobroker/status")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"online": true}"#))
        .unwrap();

    let (status, _) = send(&app(), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let padding = "x".repeat(128 * 1024);
    let body = format!(r#"{{"online": false, "note": "{}"}}"#, padding);
    let request = Request::put("/api/v1/sources/housing/status")
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    // Preflight still answered by the CORS layer
    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/api/v1/cache")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "DELETE")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(preflight).await.unwrap();
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_cache_stats_and_clear() {
    let app = app();
    get(&app, &format!("/api/v1/listings/region?{}", GURGAON)).await;
    get(&app, "/api/v1/analytics/Mumbai").await;

    let (status, body) = get(&app, "/api/v1/cache").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["size"], 2);

    let request = Request::delete("/api/v1/cache").body(Body::empty()).unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = get(&app, "/api/v1/cache").await;
    assert_eq!(body["size"], 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_query_times_out() {
    let app = app_with(CatalogConfig {
        region_latency: LatencyRange::fixed(1000),
        request_deadline: Duration::from_millis(50),
        ..CatalogConfig::instant()
    });

    let (status, body) = get(&app, &format!("/api/v1/listings/region?{}", GURGAON)).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body["error"].as_str().unwrap().contains("query_by_region"));

    // The abandoned query left nothing behind
    let (_, body) = get(&app, "/api/v1/cache").await;
    assert_eq!(body["size"], 0);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_search_on_same_channel() {
    let app = app_with(CatalogConfig {
        search_latency: LatencyRange::fixed(500),
        ..CatalogConfig::instant()
    });

    let search = |city: &str| {
        Request::get(format!("/api/v1/listings/search?city={}", city))
            .header(REQUEST_CHANNEL_HEADER, "filters")
            .body(Body::empty())
            .unwrap()
    };

    let (stale, fresh) = tokio::join!(send(&app, search("mumbai")), send(&app, search("gurgaon")));

    assert_eq!(stale.0, StatusCode::CONFLICT);
    assert_eq!(fresh.0, StatusCode::OK);
    assert_eq!(fresh.1.as_array().unwrap().len(), 3);
}
