//! Activity windows of a heat source.

use serde::Serialize;

use super::curve::ContributionCurve;
use super::error::{ErrorContext, ModelError, ModelResult};
use super::hour::{ensure_day_hour, is_day_hour};

pub const INERTIA_NOT_POSITIVE: &str = "inertia duration must be a positive number";

/// A period of the day during which a heat source is switched on.
///
/// `start_hour` must be strictly lower than `end_hour`: a source running from
/// 22h to 2h the following day is modelled with two activities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    start_hour: f64,
    end_hour: f64,
}

impl Activity {
    pub fn new(start_hour: f64, end_hour: f64) -> ModelResult<Self> {
        let context = || ErrorContext::new("new").with_entity("activity");

        if !is_day_hour(start_hour) {
            return Err(ModelError::validation("start hour must be in [0, 24[").with_context(context()));
        }
        if !is_day_hour(end_hour) {
            return Err(ModelError::validation("end hour must be in [0, 24[").with_context(context()));
        }
        if start_hour >= end_hour {
            return Err(
                ModelError::validation("start hour must be inferior than end hour")
                    .with_context(context().with_details(format!("{}-{}", start_hour, end_hour))),
            );
        }

        Ok(Self {
            start_hour,
            end_hour,
        })
    }

    pub fn start_hour(&self) -> f64 {
        self.start_hour
    }

    pub fn end_hour(&self) -> f64 {
        self.end_hour
    }

    /// Whether the activity is on at `hour`, boundaries included.
    pub fn is_on(&self, hour: f64) -> ModelResult<bool> {
        let hour = ensure_day_hour(hour, "is_on")?;
        Ok(self.start_hour <= hour && hour <= self.end_hour)
    }

    /// The decay lasts as long as the warm-up could, capped by the activity duration.
    pub fn decay_time(&self, inertia_duration: f64) -> f64 {
        inertia_duration.min(self.end_hour - self.start_hour)
    }

    /// Contribution factor of the activity at `hour`, between 0 (no contribution)
    /// and 1 (full contribution), for a source with the given inertia.
    pub fn heat_contribution_factor(&self, hour: f64, inertia_duration: f64) -> ModelResult<f64> {
        let hour = ensure_day_hour(hour, "heat_contribution_factor")?;
        Ok(self.curve(inertia_duration)?.factor(hour))
    }

    /// Closed form of the contribution factor where `t` is the hour of the day.
    pub fn heat_contribution_formula(&self, inertia_duration: f64) -> ModelResult<String> {
        Ok(self.curve(inertia_duration)?.formula())
    }

    pub fn curve(&self, inertia_duration: f64) -> ModelResult<ContributionCurve> {
        ensure_positive_inertia(inertia_duration)?;
        Ok(ContributionCurve::new(
            self.start_hour,
            self.end_hour,
            inertia_duration,
        ))
    }
}

pub(crate) fn ensure_positive_inertia(inertia_duration: f64) -> ModelResult<f64> {
    if inertia_duration.is_finite() && inertia_duration > 0.0 {
        Ok(inertia_duration)
    } else {
        Err(ModelError::validation(INERTIA_NOT_POSITIVE)
            .with_context(ErrorContext::new("curve").with_details(format!("inertia={}", inertia_duration))))
    }
}
