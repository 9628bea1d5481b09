#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use watts_rust::models::{Activity, Facility, HeatSource};
use watts_rust::monitoring::{LapseSample, ProbeReading, StreamAggregator};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Variables are restored on unwind, and access to the process environment is
/// serialized across tests.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Furnace working 9h-13h and 15h-15h30, one hour of inertia.
pub fn furnace() -> Arc<HeatSource> {
    Arc::new(
        HeatSource::new(
            "furnace",
            8.0,
            1.0,
            vec![
                Activity::new(9.0, 13.0).unwrap(),
                Activity::new(15.0, 15.5).unwrap(),
            ],
        )
        .unwrap(),
    )
}

/// Press working 12h-15h, half an hour of inertia.
pub fn press() -> Arc<HeatSource> {
    Arc::new(HeatSource::new("press", 10.0, 0.5, vec![Activity::new(12.0, 15.0).unwrap()]).unwrap())
}

/// Furnace (weight 0.5) and press (weight 0.25) over a 13° baseline.
pub fn workshop() -> Facility {
    let mut facility = Facility::new("Ker Escuelle", 13.0).unwrap();
    facility
        .add_heat_source(furnace(), 0.5)
        .unwrap()
        .add_heat_source(press(), 0.25)
        .unwrap();
    facility
}

pub fn aggregate(readings: &[ProbeReading]) -> Vec<LapseSample> {
    let mut aggregator = StreamAggregator::new();
    for reading in readings {
        aggregator.ingest(reading).unwrap();
    }
    aggregator.snapshot()
}
