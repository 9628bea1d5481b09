//! Demo facility used when no facility is configured.

use std::sync::Arc;

use super::{Activity, Facility, HeatSource, ModelResult};

pub const DEMO_FACILITY_NAME: &str = "Ker Escuelle";

/// Workshop with a heater (morning and evening), a furnace and a press.
pub fn demo_facility() -> ModelResult<Facility> {
    let heater = HeatSource::new(
        "heater",
        5.0,
        1.5,
        vec![Activity::new(5.0, 9.0)?, Activity::new(16.0, 19.0)?],
    )?;
    let furnace = HeatSource::new(
        "furnace",
        8.0,
        1.0,
        vec![Activity::new(9.0, 13.0)?, Activity::new(15.0, 16.0)?],
    )?;
    let press = HeatSource::new("press", 10.0, 0.5, vec![Activity::new(12.0, 15.0)?])?;

    let mut facility = Facility::new(DEMO_FACILITY_NAME, 13.0)?;
    facility
        .add_heat_source(Arc::new(heater), 0.4)?
        .add_heat_source(Arc::new(furnace), 0.5)?
        .add_heat_source(Arc::new(press), 0.25)?;
    Ok(facility)
}
