//! Streaming aggregation of probe readings into hourly lapse samples.

use std::collections::BTreeMap;

use log::debug;

use super::lapse_sample::{BucketId, LapseSample};
use super::reading::ProbeReading;
use crate::models::ModelResult;

/// Cache of lapse samples, one entry per hour bucket of the day.
///
/// Entries live as long as the aggregator and are updated in place by every
/// merge; callers only ever receive copies.
#[derive(Debug, Clone, Default)]
pub struct StreamAggregator {
    samples: BTreeMap<BucketId, LapseSample>,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a reading into a unit sample and merge it into its bucket.
    ///
    /// Returns a snapshot of the updated bucket entry.
    pub fn ingest(&mut self, reading: &ProbeReading) -> ModelResult<LapseSample> {
        let unit = LapseSample::from_reading(reading)?;
        Ok(self.merge(unit))
    }

    /// Merge a sample into the entry of its bucket, adopting it when the bucket is new.
    pub fn merge(&mut self, sample: LapseSample) -> LapseSample {
        let entry = match self.samples.entry(sample.id) {
            std::collections::btree_map::Entry::Vacant(slot) => slot.insert(sample),
            std::collections::btree_map::Entry::Occupied(slot) => {
                let entry = slot.into_mut();
                entry.merge(&sample);
                entry
            }
        };
        debug!(
            "Merged sample into {} (samples={}, on={}, off={})",
            entry.timeslot,
            entry.sample_count,
            entry.statuses_on.len(),
            entry.statuses_off.len()
        );
        entry.clone()
    }

    pub fn get(&self, id: BucketId) -> Option<&LapseSample> {
        self.samples.get(&id)
    }

    /// Copy of every bucket entry, ordered by hour.
    pub fn snapshot(&self) -> Vec<LapseSample> {
        self.samples.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
#[path = "aggregator_tests.rs"]
mod aggregator_tests;
