//! Heat sources: devices (oven, press, heating system...) warming their environment.

use serde::Serialize;

use super::activity::{ensure_positive_inertia, Activity};
use super::error::{ErrorContext, ModelError, ModelResult};
use super::hour::ensure_day_hour;

/// A heat source contributing to the temperature of its environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatSource {
    name: String,
    /// Heat contributed when fully warmed up
    temperature: f64,
    /// Hours needed to reach the full contribution, and to lose it
    inertia_duration: f64,
    activities: Vec<Activity>,
}

impl HeatSource {
    pub fn new(
        name: impl Into<String>,
        temperature: f64,
        inertia_duration: f64,
        activities: Vec<Activity>,
    ) -> ModelResult<Self> {
        let name = name.into();
        let context = || ErrorContext::new("new").with_entity("heat_source");

        if name.is_empty() {
            return Err(ModelError::validation("a name must be defined").with_context(context()));
        }
        if !temperature.is_finite() {
            return Err(ModelError::validation("temperature must be a number")
                .with_context(context().with_details(name)));
        }
        ensure_positive_inertia(inertia_duration)
            .map_err(|e| ModelError::validation(e.message()).with_context(context().with_details(name.clone())))?;
        if activities.is_empty() {
            return Err(ModelError::validation("some activities must be defined")
                .with_context(context().with_details(name)));
        }

        Ok(Self {
            name,
            temperature,
            inertia_duration,
            activities,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn inertia_duration(&self) -> f64 {
        self.inertia_duration
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    /// True if at least one activity is on at `hour`.
    pub fn is_on(&self, hour: f64) -> ModelResult<bool> {
        let hour = ensure_day_hour(hour, "is_on")?;
        for activity in &self.activities {
            if activity.is_on(hour)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Source temperature times the summed contribution factors of its activities.
    ///
    /// Overlapping activities add up and may exceed the nominal temperature.
    pub fn heat_contribution(&self, hour: f64) -> ModelResult<f64> {
        let hour = ensure_day_hour(hour, "heat_contribution")?;
        let factors = self
            .activities
            .iter()
            .map(|activity| activity.heat_contribution_factor(hour, self.inertia_duration))
            .sum::<ModelResult<f64>>()?;
        Ok(self.temperature * factors)
    }

    /// Closed form of the heat contribution where `t` is the hour of the day.
    pub fn heat_contribution_formula(&self) -> ModelResult<String> {
        let formulas = self
            .activities
            .iter()
            .map(|activity| activity.heat_contribution_formula(self.inertia_duration))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(format!("{}*(({}))", self.temperature, formulas.join(") + (")))
    }
}
