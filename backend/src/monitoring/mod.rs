//! Streaming aggregation of probe readings.
//!
//! Readings are folded into per-hour [`LapseSample`]s by the
//! [`StreamAggregator`]; every update is offered to the
//! [`RegressionCoordinator`], which keeps at most one regression request in
//! flight. [`MonitoringSession`] runs both behind a single lock and publishes
//! [`MonitoringEvent`]s to its subscribers.

pub mod aggregator;
pub mod coordinator;
pub mod lapse_sample;
pub mod probes;
pub mod reading;
pub mod session;

pub use aggregator::StreamAggregator;
pub use coordinator::{Admission, CoordinatorState, PendingRegressionRequest, RegressionCoordinator, ResolvedModel};
pub use lapse_sample::{BucketId, LapseSample};
pub use probes::{monitored_items, MonitoredItem, ProbeSimulator};
pub use reading::ProbeReading;
pub use session::{MonitorState, MonitoringEvent, MonitoringSession, SessionInfo, EVENT_CAPACITY};
