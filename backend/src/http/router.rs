//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Thermal model
        .route("/facility", get(handlers::get_facility))
        .route("/facility/temperature", get(handlers::get_temperature))
        // Monitoring
        .route("/lapse-samples", get(handlers::list_lapse_samples))
        .route("/sampling/start", post(handlers::start_sampling))
        .route("/sampling/stop", post(handlers::stop_sampling))
        .route("/events", get(handlers::stream_events));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplingSettings;
    use crate::models::demo_facility;
    use crate::monitoring::MonitoringSession;
    use crate::regression::RidgeRegressionService;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let session = MonitoringSession::new(Arc::new(RidgeRegressionService::default()), None);
        let sampling = SamplingSettings {
            initial_delay_ms: 60_000,
            ..SamplingSettings::default()
        };
        AppState::new(Arc::new(demo_facility().unwrap()), session, sampling)
    }

    async fn call(router: Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[test]
    fn test_router_creation() {
        let _router = create_router(test_state());
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = call(create_router(test_state()), Method::GET, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sampling"], false);
    }

    #[tokio::test]
    async fn test_get_facility() {
        let (status, body) = call(create_router(test_state()), Method::GET, "/v1/facility").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ker Escuelle");
        assert_eq!(body["heatSources"].as_array().unwrap().len(), 3);
        assert!(body["formula"].as_str().unwrap().starts_with("f(t) = 13 + (0.4*"));
    }

    #[tokio::test]
    async fn test_get_temperature() {
        let router = create_router(test_state());
        let (status, body) = call(router.clone(), Method::GET, "/v1/facility/temperature?hour=7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["temperature"], 15.0);
        assert_eq!(body["activeSources"], serde_json::json!(["heater"]));

        let (status, body) = call(router.clone(), Method::GET, "/v1/facility/temperature?hour=24").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "DOMAIN_ERROR");

        let (status, body) = call(router.clone(), Method::GET, "/v1/facility/temperature").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body["message"].as_str().unwrap().contains("hour"));

        let (status, body) = call(router, Method::GET, "/v1/facility/temperature?hour=noon").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_sampling_start_and_stop() {
        let state = test_state();
        let router = create_router(state.clone());

        let (status, first) = call(router.clone(), Method::POST, "/v1/sampling/start").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["running"], true);

        let (_, second) = call(router.clone(), Method::POST, "/v1/sampling/start").await;
        assert_eq!(first["sessionId"], second["sessionId"]);
        assert!(state.session.is_running().await);

        let (status, stopped) = call(router.clone(), Method::POST, "/v1/sampling/stop").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stopped["running"], false);
        assert!(!state.session.is_running().await);

        let (status, _) = call(router, Method::POST, "/v1/sampling/stop").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_lapse_samples_empty_cache() {
        let (status, body) = call(create_router(test_state()), Method::GET, "/v1/lapse-samples").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);
    }
}
