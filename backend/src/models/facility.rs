//! Facility: a weighted collection of heat sources over an idle baseline.

use std::sync::Arc;

use serde::Serialize;

use super::error::{ErrorContext, ModelError, ModelResult};
use super::heat_source::HeatSource;
use super::hour::ensure_day_hour;

/// A heat source plugged in a facility with its influence on the facility temperature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityHeatSource {
    heat_source: Arc<HeatSource>,
    weight: f64,
}

impl FacilityHeatSource {
    pub fn new(heat_source: Arc<HeatSource>, weight: f64) -> ModelResult<Self> {
        if !(weight.is_finite() && (0.0..=1.0).contains(&weight)) {
            return Err(
                ModelError::validation("weight must be a positive number in [0, 1]").with_context(
                    ErrorContext::new("add_heat_source")
                        .with_entity("facility_heat_source")
                        .with_details(format!("{} weight={}", heat_source.name(), weight)),
                ),
            );
        }
        Ok(Self { heat_source, weight })
    }

    pub fn heat_source(&self) -> &Arc<HeatSource> {
        &self.heat_source
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    name: String,
    /// Temperature when no heat source is working
    idle_temperature: f64,
    heat_sources: Vec<FacilityHeatSource>,
}

impl Facility {
    pub fn new(name: impl Into<String>, idle_temperature: f64) -> ModelResult<Self> {
        let name = name.into();
        let context = || ErrorContext::new("new").with_entity("facility");

        if name.is_empty() {
            return Err(ModelError::validation("a name must be defined").with_context(context()));
        }
        if !idle_temperature.is_finite() {
            return Err(ModelError::validation("the idle temperature must be a number")
                .with_context(context().with_details(name)));
        }

        Ok(Self {
            name,
            idle_temperature,
            heat_sources: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn idle_temperature(&self) -> f64 {
        self.idle_temperature
    }

    pub fn heat_sources(&self) -> &[FacilityHeatSource] {
        &self.heat_sources
    }

    /// Append a heat source with its weight; returns the facility for chaining.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use watts_rust::models::{Activity, Facility, HeatSource, ModelResult};
    /// # fn main() -> ModelResult<()> {
    /// let press = Arc::new(HeatSource::new("press", 10.0, 0.5, vec![Activity::new(12.0, 15.0)?])?);
    /// let mut facility = Facility::new("workshop", 13.0)?;
    /// facility.add_heat_source(press, 0.25)?;
    /// assert_eq!(facility.temperature_at(13.0)?, 15.5);
    /// # Ok(())
    /// # }
    /// ```
    pub fn add_heat_source(&mut self, heat_source: Arc<HeatSource>, weight: f64) -> ModelResult<&mut Self> {
        self.heat_sources
            .push(FacilityHeatSource::new(heat_source, weight)?);
        Ok(self)
    }

    /// Idle temperature plus the weighted contributions of every heat source at `hour`.
    pub fn temperature_at(&self, hour: f64) -> ModelResult<f64> {
        let hour = ensure_day_hour(hour, "temperature_at")
            .map_err(|e| {
                let context = e.context().clone().with_entity("facility");
                e.with_context(context)
            })?;

        self.heat_sources
            .iter()
            .try_fold(self.idle_temperature, |temperature, entry| {
                Ok(temperature + entry.weight * entry.heat_source.heat_contribution(hour)?)
            })
    }

    /// Names of the heat sources switched on at `hour`.
    pub fn active_sources(&self, hour: f64) -> ModelResult<Vec<String>> {
        let mut active = Vec::new();
        for entry in &self.heat_sources {
            if entry.heat_source.is_on(hour)? {
                active.push(entry.heat_source.name().to_string());
            }
        }
        Ok(active)
    }

    /// Closed form of the facility temperature where `t` is the hour of the day.
    pub fn temperature_formula(&self) -> ModelResult<String> {
        let mut elements = vec![self.idle_temperature.to_string()];
        for entry in &self.heat_sources {
            elements.push(format!(
                "({}*{})",
                entry.weight,
                entry.heat_source.heat_contribution_formula()?
            ));
        }
        Ok(elements.join(" + "))
    }
}
