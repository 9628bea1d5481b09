//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the thermal
//! model or to the monitoring session.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use tracing::warn;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use super::dto::{
    FacilityResponse, HealthResponse, LapseSamplesResponse, SamplingResponse, TemperatureQuery,
    TemperatureResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::monitoring::MonitoringEvent;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        sampling: state.session.is_running().await,
    }))
}

// =============================================================================
// Thermal Model
// =============================================================================

/// GET /v1/facility
///
/// Describe the monitored facility and its temperature formula.
pub async fn get_facility(State(state): State<AppState>) -> HandlerResult<FacilityResponse> {
    let formula = format!("f(t) = {}", state.facility.temperature_formula()?);

    Ok(Json(FacilityResponse {
        facility: state.facility.as_ref().clone(),
        formula,
    }))
}

/// GET /v1/facility/temperature?hour=h
pub async fn get_temperature(
    State(state): State<AppState>,
    query: Result<Query<TemperatureQuery>, QueryRejection>,
) -> HandlerResult<TemperatureResponse> {
    let Query(query) = query?;
    let temperature = state.facility.temperature_at(query.hour)?;
    let active_sources = state.facility.active_sources(query.hour)?;

    Ok(Json(TemperatureResponse {
        hour: query.hour,
        temperature,
        active_sources,
    }))
}

// =============================================================================
// Monitoring
// =============================================================================

/// GET /v1/lapse-samples
///
/// Current lapse sample cache, so that late subscribers can seed their view.
pub async fn list_lapse_samples(State(state): State<AppState>) -> HandlerResult<LapseSamplesResponse> {
    let samples: Vec<_> = state.session.lapse_samples().into_iter().map(Into::into).collect();
    let total = samples.len();

    Ok(Json(LapseSamplesResponse { samples, total }))
}

/// POST /v1/sampling/start
///
/// Start feeding the session with simulated probe readings. Starting a running
/// session returns the running one.
pub async fn start_sampling(State(state): State<AppState>) -> HandlerResult<SamplingResponse> {
    let readings = state.probes().into_stream(&state.sampling);
    let info = state.session.start(readings).await;

    Ok(Json(SamplingResponse::running(info)))
}

/// POST /v1/sampling/stop
pub async fn stop_sampling(State(state): State<AppState>) -> HandlerResult<SamplingResponse> {
    state.session.stop().await;

    Ok(Json(SamplingResponse::stopped()))
}

/// GET /v1/events
///
/// Stream monitoring events via Server-Sent Events (SSE). Skipped model rounds
/// and empty models are not forwarded.
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut events = state.session.subscribe();

    let stream = async_stream::stream! {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE subscriber lagging, {} events skipped", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let data = match &event {
                MonitoringEvent::LapseSampleUpdate(sample) => serde_json::to_string(sample),
                MonitoringEvent::ModelUpdate(Some(model)) => serde_json::to_string(model),
                MonitoringEvent::ModelUpdate(None) | MonitoringEvent::ModelSkipped => continue,
            };
            match data {
                Ok(data) => yield Ok(Event::default().event(event.name()).data(data)),
                Err(e) => warn!("Could not serialize {} event: {}", event.name(), e),
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(1))
            .text("keep-alive"),
    )
}
