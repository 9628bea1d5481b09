//! Regression service seam and the worker task driving it.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::{RegressionError, RegressionResult};
use super::protocol::{RegressionRequest, RegressionResponse, RequestId};
use super::ridge::{fit_regression_model, DEFAULT_ALPHA};

/// Computes a regression model for a snapshot of lapse samples.
#[async_trait]
pub trait RegressionService: Send + Sync {
    async fn compute(&self, request: RegressionRequest) -> RegressionResult<RegressionResponse>;
}

/// In-process ridge regression.
#[derive(Debug, Clone)]
pub struct RidgeRegressionService {
    alpha: f64,
}

impl RidgeRegressionService {
    pub fn new(alpha: f64) -> RegressionResult<Self> {
        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(RegressionError::InvalidParameter(format!(
                "alpha must be a non-negative number, got {}",
                alpha
            )));
        }
        Ok(Self { alpha })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Default for RidgeRegressionService {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
        }
    }
}

#[async_trait]
impl RegressionService for RidgeRegressionService {
    async fn compute(&self, request: RegressionRequest) -> RegressionResult<RegressionResponse> {
        let alpha = self.alpha;
        let RegressionRequest {
            request_id,
            samples,
        } = request;

        // Use spawn_blocking for the CPU-bound fit
        let model = tokio::task::spawn_blocking(move || fit_regression_model(&samples, alpha))
            .await
            .map_err(|e| RegressionError::TaskFailed(format!("Task join error: {}", e)))??;

        Ok(RegressionResponse { request_id, model })
    }
}

/// Spawn a task answering every request received on `requests` through `service`.
///
/// Each request is computed in its own task. A new request supersedes the one
/// still being computed, whose task is aborted: requests are only sent once
/// the previous one was resolved or abandoned, so a stalled call can never
/// hold back the next one. A failed computation is answered with an empty
/// model so that the request still resolves. The worker ends when the request
/// channel closes.
pub fn spawn_regression_worker(
    service: Arc<dyn RegressionService>,
    mut requests: mpsc::Receiver<RegressionRequest>,
    responses: mpsc::Sender<RegressionResponse>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut in_flight: Option<(RequestId, JoinHandle<()>)> = None;

        while let Some(request) = requests.recv().await {
            if let Some((previous, handle)) = in_flight.take() {
                if !handle.is_finished() {
                    warn!("Regression request {} superseded by {}, cancelling it", previous, request.request_id);
                    handle.abort();
                }
            }

            let request_id = request.request_id;
            let service = Arc::clone(&service);
            let responses = responses.clone();
            let handle = tokio::spawn(async move {
                debug!("Computing regression model for request {}", request_id);
                let response = match service.compute(request).await {
                    Ok(response) => response,
                    Err(e) => {
                        error!("Regression request {} failed: {}", request_id, e);
                        RegressionResponse {
                            request_id,
                            model: None,
                        }
                    }
                };

                if responses.send(response).await.is_err() {
                    debug!("Response receiver dropped before request {} resolved", request_id);
                }
            });
            in_flight = Some((request_id, handle));
        }

        if let Some((_, handle)) = in_flight {
            handle.abort();
        }
    })
}
