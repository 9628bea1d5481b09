//! Data Transfer Objects for the HTTP API.
//!
//! Domain types that already derive `Serialize` ([`Facility`], [`LapseSample`])
//! are embedded as-is; the DTOs add what the endpoints compute on top of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Facility;
use crate::monitoring::{LapseSample, SessionInfo};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Whether probe readings are being consumed
    pub sampling: bool,
}

/// Monitored facility with its temperature formula.
#[derive(Debug, Clone, Serialize)]
pub struct FacilityResponse {
    #[serde(flatten)]
    pub facility: Facility,
    /// `f(t) = ...` expression of the facility temperature
    pub formula: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureQuery {
    pub hour: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureResponse {
    pub hour: f64,
    pub temperature: f64,
    /// Heat sources working at that hour
    pub active_sources: Vec<String>,
}

/// Lapse sample with its derived statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LapseSampleDto {
    #[serde(flatten)]
    pub sample: LapseSample,
    pub std_deviation: Option<f64>,
}

impl From<LapseSample> for LapseSampleDto {
    fn from(sample: LapseSample) -> Self {
        Self {
            std_deviation: sample.std_deviation(),
            sample,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LapseSamplesResponse {
    /// Samples ordered by hour bucket
    pub samples: Vec<LapseSampleDto>,
    pub total: usize,
}

/// State of the sampling session after a start/stop request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingResponse {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl SamplingResponse {
    pub fn running(info: SessionInfo) -> Self {
        Self {
            running: true,
            session_id: Some(info.session_id),
            started_at: Some(info.started_at),
        }
    }

    pub fn stopped() -> Self {
        Self {
            running: false,
            session_id: None,
            started_at: None,
        }
    }
}
