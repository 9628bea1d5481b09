//! Simulated probes plugged in a facility.
//!
//! The probes randomly monitor either the global facility temperature (with a
//! uniform noise) or the on/off status of one heat source, at a random hour of
//! the day.

use std::sync::Arc;

use futures::Stream;
use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::reading::ProbeReading;
use crate::config::SamplingSettings;
use crate::models::{Facility, HeatSource, ModelResult, HOURS_PER_DAY};

/// What a probe reading measures.
#[derive(Debug, Clone)]
pub enum MonitoredItem {
    FacilityTemperature,
    HeatSourceStatus(Arc<HeatSource>),
}

/// Monitored items of a facility: its temperature listed `temperature_weight`
/// times (to sample it more often), then every heat source.
pub fn monitored_items(facility: &Facility, temperature_weight: usize) -> Vec<MonitoredItem> {
    let mut items = vec![MonitoredItem::FacilityTemperature; temperature_weight.max(1)];
    items.extend(
        facility
            .heat_sources()
            .iter()
            .map(|entry| MonitoredItem::HeatSourceStatus(Arc::clone(entry.heat_source()))),
    );
    items
}

/// Uniform noise around `value`, in `[value - range/2, value + range/2]`.
fn noise<R: Rng>(rng: &mut R, value: f64, range: f64) -> f64 {
    value + range * (0.5 - rng.random::<f64>())
}

pub struct ProbeSimulator<R = StdRng> {
    facility: Arc<Facility>,
    items: Vec<MonitoredItem>,
    noise_range: f64,
    rng: R,
}

impl ProbeSimulator<StdRng> {
    pub fn new(facility: Arc<Facility>, settings: &SamplingSettings) -> Self {
        Self::with_rng(facility, settings, StdRng::from_os_rng())
    }

    /// Reproducible simulator.
    pub fn seeded(facility: Arc<Facility>, settings: &SamplingSettings, seed: u64) -> Self {
        Self::with_rng(facility, settings, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ProbeSimulator<R> {
    pub fn with_rng(facility: Arc<Facility>, settings: &SamplingSettings, rng: R) -> Self {
        let items = monitored_items(&facility, settings.temperature_weight);
        Self {
            facility,
            items,
            noise_range: settings.noise_range,
            rng,
        }
    }

    pub fn items(&self) -> &[MonitoredItem] {
        &self.items
    }

    /// Monitor a random item at a random hour.
    pub fn sample(&mut self) -> ModelResult<ProbeReading> {
        let index = self.rng.random_range(0..self.items.len());
        let hour = HOURS_PER_DAY * self.rng.random::<f64>();

        match &self.items[index] {
            MonitoredItem::FacilityTemperature => {
                let temperature = self.facility.temperature_at(hour)?;
                Ok(ProbeReading::temperature(
                    hour,
                    noise(&mut self.rng, temperature, self.noise_range),
                ))
            }
            MonitoredItem::HeatSourceStatus(source) => Ok(ProbeReading::status(
                hour,
                source.name(),
                source.is_on(hour)?,
            )),
        }
    }
}

impl<R: Rng + Send + 'static> ProbeSimulator<R> {
    /// Endless stream of readings: the first after `initial_delay`, then one every `period`.
    pub fn into_stream(mut self, settings: &SamplingSettings) -> impl Stream<Item = ProbeReading> + Send + 'static {
        let initial_delay = settings.initial_delay();
        let period = settings.period();

        async_stream::stream! {
            tokio::time::sleep(initial_delay).await;
            let mut ticks = tokio::time::interval(period);
            loop {
                ticks.tick().await;
                match self.sample() {
                    Ok(reading) => yield reading,
                    Err(e) => warn!("Probe sampling failed: {}", e),
                }
            }
        }
    }
}
