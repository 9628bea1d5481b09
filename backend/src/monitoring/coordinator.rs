//! Single-flight admission control for regression requests.
//!
//! After every aggregator update the coordinator either dispatches a request
//! carrying the full sample cache (when idle) or reports that the round is
//! skipped (when a request is already outstanding). Updates arriving while busy
//! are dropped, never queued.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

use super::lapse_sample::LapseSample;
use crate::regression::{RegressionModel, RegressionRequest, RegressionResponse, RequestId};

/// The request currently awaiting its response.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRegressionRequest {
    pub request_id: RequestId,
    pub dispatched_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CoordinatorState {
    #[default]
    Idle,
    Busy(PendingRegressionRequest),
}

/// Outcome of an aggregator update.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Send this request to the regression service.
    Dispatch(RegressionRequest),
    /// A request is already in flight: no model is computed this round.
    Skipped { pending: RequestId },
}

/// A response matched to the outstanding request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModel {
    pub request_id: RequestId,
    pub model: Option<RegressionModel>,
}

#[derive(Debug)]
pub struct RegressionCoordinator {
    state: CoordinatorState,
    last_request_id: RequestId,
    /// Pending requests older than this are abandoned; `None` waits forever
    request_timeout: Option<Duration>,
}

impl RegressionCoordinator {
    pub fn new(request_timeout: Option<Duration>) -> Self {
        Self {
            state: CoordinatorState::Idle,
            last_request_id: RequestId::new(0),
            request_timeout,
        }
    }

    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, CoordinatorState::Busy(_))
    }

    pub fn pending_request_id(&self) -> Option<RequestId> {
        match &self.state {
            CoordinatorState::Busy(pending) => Some(pending.request_id),
            CoordinatorState::Idle => None,
        }
    }

    /// Admission decision for an aggregator update.
    ///
    /// `samples` is only evaluated when a request is dispatched.
    pub fn on_update<F>(&mut self, samples: F, now: Instant) -> Admission
    where
        F: FnOnce() -> Vec<LapseSample>,
    {
        self.expire(now);

        if let CoordinatorState::Busy(pending) = &self.state {
            debug!("Regression request {} in flight, skipping model round", pending.request_id);
            return Admission::Skipped {
                pending: pending.request_id,
            };
        }

        let request_id = self.last_request_id.next();
        self.last_request_id = request_id;
        self.state = CoordinatorState::Busy(PendingRegressionRequest {
            request_id,
            dispatched_at: now,
        });

        let samples = samples();
        debug!("Dispatching regression request {} with {} samples", request_id, samples.len());
        Admission::Dispatch(RegressionRequest {
            request_id,
            samples,
        })
    }

    /// Resolve the outstanding request if the response correlates with it.
    ///
    /// Stale or unknown responses are logged and discarded.
    pub fn on_response(&mut self, response: RegressionResponse) -> Option<ResolvedModel> {
        let pending = self.pending_request_id();
        if pending != Some(response.request_id) {
            warn!(
                "Discarding regression response {}: no matching pending request (pending={:?})",
                response.request_id, pending
            );
            return None;
        }

        info!(
            "Regression request {} resolved ({})",
            response.request_id,
            if response.model.is_some() { "model" } else { "no model" }
        );
        self.state = CoordinatorState::Idle;
        Some(ResolvedModel {
            request_id: response.request_id,
            model: response.model,
        })
    }

    /// Drop the outstanding request, if any, and reopen admission.
    pub fn abandon(&mut self) -> Option<RequestId> {
        let abandoned = self.pending_request_id();
        if let Some(request_id) = abandoned {
            info!("Abandoning regression request {}", request_id);
        }
        self.state = CoordinatorState::Idle;
        abandoned
    }

    fn expire(&mut self, now: Instant) {
        let (CoordinatorState::Busy(pending), Some(timeout)) = (&self.state, self.request_timeout) else {
            return;
        };
        if now.saturating_duration_since(pending.dispatched_at) >= timeout {
            warn!(
                "Regression request {} unanswered after {:?}, reopening admission",
                pending.request_id, timeout
            );
            self.state = CoordinatorState::Idle;
        }
    }
}

impl Default for RegressionCoordinator {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn respond(request_id: u64) -> RegressionResponse {
        RegressionResponse {
            request_id: RequestId::new(request_id),
            model: Some(RegressionModel {
                intercept: 13.0,
                score: 0.5,
                coefficients: vec![],
            }),
        }
    }

    fn dispatched_id(admission: Admission) -> RequestId {
        match admission {
            Admission::Dispatch(request) => request.request_id,
            other => panic!("expected a dispatch, got {:?}", other),
        }
    }

    #[test]
    fn test_idle_update_dispatches() {
        let mut coordinator = RegressionCoordinator::default();
        let now = Instant::now();

        let admission = coordinator.on_update(Vec::new, now);
        assert_eq!(dispatched_id(admission), RequestId::new(1));
        assert!(coordinator.is_busy());
        assert_eq!(coordinator.pending_request_id(), Some(RequestId::new(1)));
    }

    #[test]
    fn test_busy_update_is_skipped_without_snapshot() {
        let mut coordinator = RegressionCoordinator::default();
        let now = Instant::now();
        coordinator.on_update(Vec::new, now);

        let admission = coordinator.on_update(|| panic!("snapshot taken while busy"), now);
        assert_eq!(
            admission,
            Admission::Skipped {
                pending: RequestId::new(1)
            }
        );
    }

    #[test]
    fn test_matching_response_reopens_admission() {
        let mut coordinator = RegressionCoordinator::default();
        let now = Instant::now();
        coordinator.on_update(Vec::new, now);

        let resolved = coordinator.on_response(respond(1)).unwrap();
        assert_eq!(resolved.request_id, RequestId::new(1));
        assert!(resolved.model.is_some());
        assert!(!coordinator.is_busy());

        assert_eq!(dispatched_id(coordinator.on_update(Vec::new, now)), RequestId::new(2));
    }

    #[test]
    fn test_unknown_response_is_discarded() {
        let mut coordinator = RegressionCoordinator::default();
        let now = Instant::now();

        assert!(coordinator.on_response(respond(1)).is_none());

        coordinator.on_update(Vec::new, now);
        assert!(coordinator.on_response(respond(42)).is_none());
        assert_eq!(coordinator.pending_request_id(), Some(RequestId::new(1)));

        // duplicate of an already-resolved response
        assert!(coordinator.on_response(respond(1)).is_some());
        assert!(coordinator.on_response(respond(1)).is_none());
    }

    #[test]
    fn test_request_ids_are_monotonic() {
        let mut coordinator = RegressionCoordinator::default();
        let now = Instant::now();
        let mut ids = Vec::new();
        for _ in 0..5 {
            let id = dispatched_id(coordinator.on_update(Vec::new, now));
            coordinator.on_response(respond(id.value()));
            ids.push(id.value());
        }
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_timeout_reopens_admission() {
        let mut coordinator = RegressionCoordinator::new(Some(Duration::from_secs(30)));
        let start = Instant::now();
        coordinator.on_update(Vec::new, start);

        let admission = coordinator.on_update(Vec::new, start + Duration::from_secs(29));
        assert!(matches!(admission, Admission::Skipped { .. }));

        let admission = coordinator.on_update(Vec::new, start + Duration::from_secs(30));
        assert_eq!(dispatched_id(admission), RequestId::new(2));

        // late answer to the abandoned request
        assert!(coordinator.on_response(respond(1)).is_none());
        assert_eq!(coordinator.pending_request_id(), Some(RequestId::new(2)));
    }

    #[test]
    fn test_without_timeout_stays_busy() {
        let mut coordinator = RegressionCoordinator::new(None);
        let start = Instant::now();
        coordinator.on_update(Vec::new, start);

        let admission = coordinator.on_update(Vec::new, start + Duration::from_secs(86_400));
        assert!(matches!(admission, Admission::Skipped { .. }));
    }

    #[test]
    fn test_abandon() {
        let mut coordinator = RegressionCoordinator::default();
        assert_eq!(coordinator.abandon(), None);

        coordinator.on_update(Vec::new, Instant::now());
        assert_eq!(coordinator.abandon(), Some(RequestId::new(1)));
        assert_eq!(coordinator.state(), &CoordinatorState::Idle);
    }
}
