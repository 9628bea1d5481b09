//! Monitoring session: consumes probe readings, maintains the lapse sample
//! cache and keeps at most one regression request in flight.
//!
//! Every accepted reading produces a [`MonitoringEvent::LapseSampleUpdate`]
//! carrying the updated sample. Model rounds then either dispatch a request to
//! the regression worker or emit [`MonitoringEvent::ModelSkipped`]. Resolved
//! requests surface as [`MonitoringEvent::ModelUpdate`], and so does a request
//! the worker could not accept (with no model).
//!
//! The aggregator and the coordinator share one lock so that an update and its
//! admission decision are observed together.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use super::aggregator::StreamAggregator;
use super::coordinator::{Admission, RegressionCoordinator, ResolvedModel};
use super::lapse_sample::LapseSample;
use super::reading::ProbeReading;
use crate::models::ModelResult;
use crate::regression::{
    spawn_regression_worker, RegressionModel, RegressionRequest, RegressionResponse, RegressionService,
    RequestId,
};

/// Buffered events per subscriber before the slowest one starts lagging.
pub const EVENT_CAPACITY: usize = 256;

const REQUEST_QUEUE: usize = 4;

/// Event pushed to the observers of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum MonitoringEvent {
    LapseSampleUpdate(LapseSample),
    /// Answer of the outstanding request; `None` when no model could be computed.
    ModelUpdate(Option<RegressionModel>),
    /// A request was already in flight when the cache changed.
    ModelSkipped,
}

impl MonitoringEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LapseSampleUpdate(_) => "lapseSampleUpdate",
            Self::ModelUpdate(_) => "modelUpdate",
            Self::ModelSkipped => "modelSkipped",
        }
    }
}

/// Lapse sample cache and regression admission, updated together.
#[derive(Debug, Default)]
pub struct MonitorState {
    aggregator: StreamAggregator,
    coordinator: RegressionCoordinator,
}

impl MonitorState {
    pub fn new(request_timeout: Option<Duration>) -> Self {
        Self {
            aggregator: StreamAggregator::new(),
            coordinator: RegressionCoordinator::new(request_timeout),
        }
    }

    /// Fold a reading into the cache, then decide on a model round.
    ///
    /// An invalid reading leaves both the cache and the coordinator untouched.
    pub fn process_reading(&mut self, reading: &ProbeReading, now: Instant) -> ModelResult<(LapseSample, Admission)> {
        let sample = self.aggregator.ingest(reading)?;
        let aggregator = &self.aggregator;
        let admission = self.coordinator.on_update(|| aggregator.snapshot(), now);
        Ok((sample, admission))
    }

    pub fn process_response(&mut self, response: RegressionResponse) -> Option<ResolvedModel> {
        self.coordinator.on_response(response)
    }

    pub fn abandon_pending(&mut self) -> Option<RequestId> {
        self.coordinator.abandon()
    }

    pub fn snapshot(&self) -> Vec<LapseSample> {
        self.aggregator.snapshot()
    }

    pub fn aggregator(&self) -> &StreamAggregator {
        &self.aggregator
    }

    pub fn coordinator(&self) -> &RegressionCoordinator {
        &self.coordinator
    }
}

/// Identity of a running session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
}

struct RunningSession {
    info: SessionInfo,
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Handle on the monitoring loop. Cheap to clone.
#[derive(Clone)]
pub struct MonitoringSession {
    state: Arc<Mutex<MonitorState>>,
    events: broadcast::Sender<MonitoringEvent>,
    service: Arc<dyn RegressionService>,
    runner: Arc<tokio::sync::Mutex<Option<RunningSession>>>,
}

impl MonitoringSession {
    pub fn new(service: Arc<dyn RegressionService>, request_timeout: Option<Duration>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(MonitorState::new(request_timeout))),
            events,
            service,
            runner: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Start consuming `readings`. A session already running is kept and
    /// `readings` is dropped.
    pub async fn start<S>(&self, readings: S) -> SessionInfo
    where
        S: Stream<Item = ProbeReading> + Send + 'static,
    {
        let mut runner = self.runner.lock().await;
        if let Some(running) = runner.as_ref() {
            if !running.handle.is_finished() {
                debug!("Monitoring session {} already running", running.info.session_id);
                return running.info.clone();
            }
        }

        let info = SessionInfo {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        let (cancel, cancelled) = oneshot::channel();
        let handle = tokio::spawn(run_session(
            Arc::clone(&self.state),
            self.events.clone(),
            Arc::clone(&self.service),
            readings,
            cancelled,
        ));
        info!("Monitoring session {} started", info.session_id);

        *runner = Some(RunningSession {
            info: info.clone(),
            cancel,
            handle,
        });
        info
    }

    /// Stop the running session and wait for its loop to exit.
    ///
    /// Returns `None` when no session was running.
    pub async fn stop(&self) -> Option<SessionInfo> {
        let running = self.runner.lock().await.take()?;
        // the loop may already be gone when its stream ended
        let _ = running.cancel.send(());
        if let Err(e) = running.handle.await {
            warn!("Monitoring session {} ended abnormally: {}", running.info.session_id, e);
        }
        info!("Monitoring session {} stopped", running.info.session_id);
        Some(running.info)
    }

    pub async fn status(&self) -> Option<SessionInfo> {
        self.runner
            .lock()
            .await
            .as_ref()
            .filter(|running| !running.handle.is_finished())
            .map(|running| running.info.clone())
    }

    pub async fn is_running(&self) -> bool {
        self.status().await.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitoringEvent> {
        self.events.subscribe()
    }

    /// Copy of the lapse sample cache, ordered by bucket.
    pub fn lapse_samples(&self) -> Vec<LapseSample> {
        self.state.lock().snapshot()
    }

    pub fn is_model_pending(&self) -> bool {
        self.state.lock().coordinator().is_busy()
    }
}

async fn run_session<S>(
    state: Arc<Mutex<MonitorState>>,
    events: broadcast::Sender<MonitoringEvent>,
    service: Arc<dyn RegressionService>,
    readings: S,
    mut cancelled: oneshot::Receiver<()>,
) where
    S: Stream<Item = ProbeReading> + Send + 'static,
{
    let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE);
    let (response_tx, mut response_rx) = mpsc::channel(REQUEST_QUEUE);
    let worker = spawn_regression_worker(service, request_rx, response_tx);
    futures::pin_mut!(readings);

    loop {
        tokio::select! {
            biased;

            _ = &mut cancelled => {
                debug!("Monitoring loop cancelled");
                break;
            }

            Some(response) = response_rx.recv() => {
                let resolved = state.lock().process_response(response);
                if let Some(resolved) = resolved {
                    publish(&events, MonitoringEvent::ModelUpdate(resolved.model));
                }
            }

            reading = readings.next() => {
                let Some(reading) = reading else {
                    info!("Probe stream ended");
                    break;
                };

                let outcome = state.lock().process_reading(&reading, Instant::now());
                let (sample, admission) = match outcome {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Dropping probe reading {:?}: {}", reading, e);
                        continue;
                    }
                };

                publish(&events, MonitoringEvent::LapseSampleUpdate(sample));
                match admission {
                    Admission::Dispatch(request) => dispatch(&state, &events, &request_tx, request),
                    Admission::Skipped { .. } => publish(&events, MonitoringEvent::ModelSkipped),
                }
            }
        }
    }

    // closing the request channel stops the worker, which cancels the call in flight
    drop(request_tx);
    if let Err(e) = worker.await {
        warn!("Regression worker ended abnormally: {}", e);
    }
    state.lock().abandon_pending();
}

/// Hand a request to the worker. When it cannot be queued the round resolves
/// at once without a model.
fn dispatch(
    state: &Mutex<MonitorState>,
    events: &broadcast::Sender<MonitoringEvent>,
    requests: &mpsc::Sender<RegressionRequest>,
    request: RegressionRequest,
) {
    let request_id = request.request_id;
    if let Err(e) = requests.try_send(request) {
        warn!("Could not dispatch regression request {}: {}", request_id, e);
        if state.lock().abandon_pending().is_some() {
            publish(events, MonitoringEvent::ModelUpdate(None));
        }
    }
}

fn publish(events: &broadcast::Sender<MonitoringEvent>, event: MonitoringEvent) {
    // no subscriber is not an error
    let _ = events.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::{RegressionError, RegressionResult};
    use async_trait::async_trait;
    use futures::stream;
    use tokio::sync::Semaphore;

    /// Answers one request per released permit; the intercept is the number of samples sent.
    struct GatedService {
        gate: Semaphore,
        received: Mutex<Vec<RequestId>>,
    }

    impl GatedService {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                gate: Semaphore::new(0),
                received: Mutex::new(Vec::new()),
            })
        }

        fn received(&self) -> Vec<RequestId> {
            self.received.lock().clone()
        }

        async fn wait_for_requests(&self, count: usize) {
            tokio::time::timeout(Duration::from_secs(5), async {
                while self.received.lock().len() < count {
                    tokio::task::yield_now().await;
                }
            })
            .await
            .expect("requests not received");
        }
    }

    #[async_trait]
    impl RegressionService for GatedService {
        async fn compute(&self, request: RegressionRequest) -> RegressionResult<RegressionResponse> {
            self.received.lock().push(request.request_id);
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| RegressionError::TaskFailed(e.to_string()))?;
            permit.forget();
            Ok(RegressionResponse {
                request_id: request.request_id,
                model: Some(RegressionModel {
                    intercept: request.samples.len() as f64,
                    score: 1.0,
                    coefficients: Vec::new(),
                }),
            })
        }
    }

    fn readings(readings: Vec<ProbeReading>) -> impl Stream<Item = ProbeReading> + Send + 'static {
        stream::iter(readings).chain(stream::pending())
    }

    async fn next_event(rx: &mut broadcast::Receiver<MonitoringEvent>) -> MonitoringEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event received")
            .unwrap()
    }

    fn bucket(event: &MonitoringEvent) -> u8 {
        match event {
            MonitoringEvent::LapseSampleUpdate(sample) => sample.id.value(),
            other => panic!("expected a lapse sample update, got {:?}", other),
        }
    }

    #[test]
    fn test_process_reading_dispatches_then_skips() {
        let mut state = MonitorState::new(None);
        let now = Instant::now();

        let (sample, admission) = state.process_reading(&ProbeReading::temperature(3.2, 10.0), now).unwrap();
        assert_eq!(sample.sample_count, 1);
        let Admission::Dispatch(request) = admission else {
            panic!("first update must dispatch");
        };
        assert_eq!(request.samples, vec![sample]);

        let (_, admission) = state.process_reading(&ProbeReading::temperature(4.2, 12.0), now).unwrap();
        assert_eq!(admission, Admission::Skipped { pending: request.request_id });
        assert_eq!(state.snapshot().len(), 2);
    }

    #[test]
    fn test_invalid_reading_leaves_state_untouched() {
        let mut state = MonitorState::new(None);
        assert!(state.process_reading(&ProbeReading::temperature(24.0, 10.0), Instant::now()).is_err());
        assert!(state.snapshot().is_empty());
        assert!(!state.coordinator().is_busy());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(MonitoringEvent::ModelUpdate(None)).unwrap();
        assert_eq!(json, serde_json::json!({"event": "modelUpdate", "data": null}));
        let json = serde_json::to_value(MonitoringEvent::ModelSkipped).unwrap();
        assert_eq!(json, serde_json::json!({"event": "modelSkipped"}));
    }

    #[tokio::test]
    async fn test_single_flight_session() {
        let service = GatedService::new();
        let session = MonitoringSession::new(service.clone(), None);
        let mut rx = session.subscribe();

        session
            .start(readings(vec![
                ProbeReading::temperature(3.0, 10.0),
                ProbeReading::status(3.5, "furnace", false),
                ProbeReading::temperature(10.0, 20.0),
            ]))
            .await;

        assert_eq!(bucket(&next_event(&mut rx).await), 3);
        assert_eq!(bucket(&next_event(&mut rx).await), 3);
        assert_eq!(next_event(&mut rx).await, MonitoringEvent::ModelSkipped);
        assert_eq!(bucket(&next_event(&mut rx).await), 10);
        assert_eq!(next_event(&mut rx).await, MonitoringEvent::ModelSkipped);

        service.gate.add_permits(1);
        match next_event(&mut rx).await {
            // the request carried the cache as it was at dispatch time
            MonitoringEvent::ModelUpdate(Some(model)) => assert_eq!(model.intercept, 1.0),
            other => panic!("expected a model update, got {:?}", other),
        }
        assert_eq!(service.received(), vec![RequestId::new(1)]);
        assert_eq!(session.lapse_samples().len(), 2);
        assert!(!session.is_model_pending());

        session.stop().await;
    }

    #[tokio::test]
    async fn test_stop_abandons_pending_request() {
        let service = GatedService::new();
        let session = MonitoringSession::new(service.clone(), None);
        let mut rx = session.subscribe();

        session.start(readings(vec![ProbeReading::temperature(3.0, 10.0)])).await;
        next_event(&mut rx).await;
        assert!(session.is_model_pending());
        service.wait_for_requests(1).await;

        assert!(session.stop().await.is_some());
        assert!(!session.is_running().await);
        assert!(!session.is_model_pending());
        assert!(session.stop().await.is_none());

        // a new session dispatches again, with the next request id
        session.start(readings(vec![ProbeReading::temperature(4.0, 11.0)])).await;
        next_event(&mut rx).await;
        service.wait_for_requests(2).await;
        assert_eq!(service.received(), vec![RequestId::new(1), RequestId::new(2)]);
        session.stop().await;
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let session = MonitoringSession::new(GatedService::new(), None);
        let first = session.start(readings(Vec::new())).await;
        let second = session.start(readings(Vec::new())).await;
        assert_eq!(first, second);
        assert_eq!(session.status().await, Some(first));
        session.stop().await;
    }

    #[tokio::test]
    async fn test_invalid_readings_are_dropped() {
        let session = MonitoringSession::new(GatedService::new(), None);
        let mut rx = session.subscribe();

        session
            .start(readings(vec![
                ProbeReading::temperature(-1.0, 10.0),
                ProbeReading::temperature(5.5, 10.0),
            ]))
            .await;

        assert_eq!(bucket(&next_event(&mut rx).await), 5);
        assert_eq!(session.lapse_samples().len(), 1);
        session.stop().await;
    }

    #[tokio::test]
    async fn test_session_ends_with_its_stream() {
        let session = MonitoringSession::new(GatedService::new(), None);
        session
            .start(stream::iter(vec![ProbeReading::temperature(1.0, 10.0)]))
            .await;

        tokio::time::timeout(Duration::from_secs(5), async {
            while session.is_running().await {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(!session.is_model_pending());
        assert_eq!(session.lapse_samples().len(), 1);
    }

    /// Answers request 1 only after `stall`; every other request at once.
    /// The intercept of a model is the id of the request it answers.
    struct SlowFirstService {
        stall: Duration,
        received: Mutex<Vec<RequestId>>,
    }

    #[async_trait]
    impl RegressionService for SlowFirstService {
        async fn compute(&self, request: RegressionRequest) -> RegressionResult<RegressionResponse> {
            self.received.lock().push(request.request_id);
            if request.request_id == RequestId::new(1) {
                tokio::time::sleep(self.stall).await;
            }
            Ok(RegressionResponse {
                request_id: request.request_id,
                model: Some(RegressionModel {
                    intercept: request.request_id.value() as f64,
                    score: 1.0,
                    coefficients: Vec::new(),
                }),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_request_is_replaced_and_its_late_answer_ignored() {
        let service = Arc::new(SlowFirstService {
            stall: Duration::from_secs(45),
            received: Mutex::new(Vec::new()),
        });
        let session = MonitoringSession::new(service.clone(), Some(Duration::from_secs(30)));
        let mut rx = session.subscribe();
        let (tx, stream) = futures::channel::mpsc::unbounded();
        session.start(stream).await;

        tx.unbounded_send(ProbeReading::temperature(3.0, 10.0)).unwrap();
        assert_eq!(bucket(&next_event(&mut rx).await), 3);
        assert!(session.is_model_pending());

        // before the deadline the stalled request still holds admission
        tokio::time::sleep(Duration::from_secs(10)).await;
        tx.unbounded_send(ProbeReading::temperature(4.0, 11.0)).unwrap();
        assert_eq!(bucket(&next_event(&mut rx).await), 4);
        assert_eq!(next_event(&mut rx).await, MonitoringEvent::ModelSkipped);

        tokio::time::sleep(Duration::from_secs(21)).await;
        tx.unbounded_send(ProbeReading::temperature(5.0, 12.0)).unwrap();
        assert_eq!(bucket(&next_event(&mut rx).await), 5);
        match next_event(&mut rx).await {
            MonitoringEvent::ModelUpdate(Some(model)) => assert_eq!(model.intercept, 2.0),
            other => panic!("expected the model of request 2, got {:?}", other),
        }
        assert_eq!(service.received.lock().clone(), vec![RequestId::new(1), RequestId::new(2)]);
        assert!(!session.is_model_pending());

        // past the moment request 1 would have answered, nothing more is published
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));

        session.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_service_never_starves_later_rounds() {
        let service = Arc::new(SlowFirstService {
            stall: Duration::from_secs(3600),
            received: Mutex::new(Vec::new()),
        });
        let session = MonitoringSession::new(service.clone(), Some(Duration::from_secs(30)));
        let mut rx = session.subscribe();
        let (tx, stream) = futures::channel::mpsc::unbounded();
        session.start(stream).await;

        for round in 0..6u64 {
            tx.unbounded_send(ProbeReading::temperature(round as f64, 10.0)).unwrap();
            assert_eq!(bucket(&next_event(&mut rx).await), round as u8);
            if round > 0 {
                match next_event(&mut rx).await {
                    MonitoringEvent::ModelUpdate(Some(model)) => assert_eq!(model.intercept, (round + 1) as f64),
                    other => panic!("round {}: expected a model update, got {:?}", round, other),
                }
            }
            tokio::time::sleep(Duration::from_secs(31)).await;
        }
        assert_eq!(service.received.lock().len(), 6);
        session.stop().await;
    }

    #[tokio::test]
    async fn test_undeliverable_request_resolves_without_model() {
        let state = Mutex::new(MonitorState::new(None));
        let (events, mut rx) = broadcast::channel(8);
        let (request_tx, request_rx) = mpsc::channel(1);
        drop(request_rx);

        let (_, admission) = state
            .lock()
            .process_reading(&ProbeReading::temperature(3.0, 10.0), Instant::now())
            .unwrap();
        let Admission::Dispatch(request) = admission else {
            panic!("first update must dispatch");
        };
        dispatch(&state, &events, &request_tx, request);

        assert!(!state.lock().coordinator().is_busy());
        assert_eq!(rx.try_recv().unwrap(), MonitoringEvent::ModelUpdate(None));

        // the next update opens a new round
        let (_, admission) = state
            .lock()
            .process_reading(&ProbeReading::temperature(4.0, 10.0), Instant::now())
            .unwrap();
        assert!(matches!(admission, Admission::Dispatch(r) if r.request_id == RequestId::new(2)));
    }
}
