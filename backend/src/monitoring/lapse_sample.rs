//! Hourly aggregation buckets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::reading::ProbeReading;
use crate::models::{bucket_of, ModelResult};

crate::define_id_type!(
    /// Hour bucket of the day, `floor(hour)` in `[0, 23]`.
    u8,
    BucketId
);

impl BucketId {
    /// Display label of the bucket, e.g. `"9-10h"`.
    pub fn timeslot(&self) -> String {
        format!("{}-{}h", self.0, self.0 + 1)
    }
}

/// Statistics aggregated over one hour of the day.
///
/// Temperatures are summarized by their running mean and mean of squares so that
/// samples merge without being stored. `mean_temperature` stays `None` until a
/// temperature has been merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapseSample {
    pub id: BucketId,
    pub timeslot: String,
    #[serde(rename = "meanT")]
    pub mean_temperature: Option<f64>,
    #[serde(rename = "meanSquares")]
    pub mean_squares: f64,
    #[serde(rename = "nbSamples")]
    pub sample_count: u64,
    /// Heat sources seen on during this hour
    #[serde(rename = "statusesOn")]
    pub statuses_on: BTreeSet<String>,
    /// Heat sources seen off during this hour
    #[serde(rename = "statusesOff")]
    pub statuses_off: BTreeSet<String>,
}

impl LapseSample {
    /// Empty sample of the bucket containing `hour`.
    pub fn empty(hour: f64) -> ModelResult<Self> {
        let id = BucketId::new(bucket_of(hour)?);
        Ok(Self {
            id,
            timeslot: id.timeslot(),
            mean_temperature: None,
            mean_squares: 0.0,
            sample_count: 0,
            statuses_on: BTreeSet::new(),
            statuses_off: BTreeSet::new(),
        })
    }

    /// Unit sample holding a single probe reading.
    pub fn from_reading(reading: &ProbeReading) -> ModelResult<Self> {
        let mut sample = Self::empty(reading.hour())?;
        match reading {
            ProbeReading::Status {
                heat_source, is_on, ..
            } => {
                let statuses = if *is_on {
                    &mut sample.statuses_on
                } else {
                    &mut sample.statuses_off
                };
                statuses.insert(heat_source.clone());
            }
            ProbeReading::Temperature { temperature, .. } => {
                sample.mean_temperature = Some(*temperature);
                sample.mean_squares = temperature * temperature;
                sample.sample_count = 1;
            }
        }
        Ok(sample)
    }

    /// Merge another sample of the same bucket into this one.
    ///
    /// Means and means of squares combine weighted by their sample counts;
    /// statuses are unioned.
    pub fn merge(&mut self, other: &LapseSample) {
        debug_assert_eq!(self.id, other.id, "merging samples of different buckets");

        if let Some(incoming) = other.mean_temperature.filter(|_| other.sample_count > 0) {
            match self.mean_temperature.filter(|_| self.sample_count > 0) {
                None => {
                    self.mean_temperature = Some(incoming);
                    self.mean_squares = other.mean_squares;
                    self.sample_count = other.sample_count;
                }
                Some(current) => {
                    let total = self.sample_count + other.sample_count;
                    let (n_current, n_incoming, n_total) =
                        (self.sample_count as f64, other.sample_count as f64, total as f64);
                    self.mean_temperature =
                        Some((n_incoming * incoming + n_current * current) / n_total);
                    self.mean_squares =
                        (self.mean_squares * n_current + other.mean_squares * n_incoming) / n_total;
                    self.sample_count = total;
                }
            }
        }

        self.statuses_on.extend(other.statuses_on.iter().cloned());
        self.statuses_off.extend(other.statuses_off.iter().cloned());
    }

    /// Population standard deviation of the merged temperatures.
    pub fn std_deviation(&self) -> Option<f64> {
        let mean = self.mean_temperature.filter(|_| self.sample_count > 0)?;
        Some((self.mean_squares - mean * mean).max(0.0).sqrt())
    }
}
