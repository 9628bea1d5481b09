//! Messages exchanged with the regression service.

use serde::{Deserialize, Serialize};

use crate::monitoring::LapseSample;

crate::define_id_type!(
    /// Correlates a regression request with its response. Unique for the process lifetime.
    u64,
    RequestId
);

impl RequestId {
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// Snapshot of the lapse sample cache sent for model fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionRequest {
    pub request_id: RequestId,
    pub samples: Vec<LapseSample>,
}

/// Model computed for a request; `model` is `None` when no model could be fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionResponse {
    pub request_id: RequestId,
    pub model: Option<RegressionModel>,
}

/// Linear model of the facility temperature from the heat source statuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    pub intercept: f64,
    /// Coefficient of determination on the fitted samples
    pub score: f64,
    pub coefficients: Vec<SourceCoefficient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCoefficient {
    pub source: String,
    pub coef: f64,
}
