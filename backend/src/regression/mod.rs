//! Regression models of the facility temperature.
//!
//! The monitoring session sends snapshots of the lapse sample cache to a
//! [`RegressionService`] and correlates the answers by [`RequestId`]. The
//! bundled [`RidgeRegressionService`] fits the model in-process.

pub mod error;
pub mod protocol;
pub mod ridge;
pub mod service;

pub use error::{RegressionError, RegressionResult};
pub use protocol::{RegressionModel, RegressionRequest, RegressionResponse, RequestId, SourceCoefficient};
pub use ridge::{fit_regression_model, DEFAULT_ALPHA};
pub use service::{spawn_regression_worker, RegressionService, RidgeRegressionService};
