//! Probe readings produced by the sampling collaborator.

use serde::{Deserialize, Serialize};

/// A single probe measurement, either a heat source status or the facility temperature.
///
/// On the wire the two shapes are told apart by the presence of `heatSource`:
/// `{"hour": 9.2, "heatSource": "furnace", "isOn": true}` or
/// `{"hour": 9.2, "temperature": 15.1}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeReading {
    Status {
        hour: f64,
        #[serde(rename = "heatSource")]
        heat_source: String,
        #[serde(rename = "isOn")]
        is_on: bool,
    },
    Temperature {
        hour: f64,
        temperature: f64,
    },
}

impl ProbeReading {
    pub fn status(hour: f64, heat_source: impl Into<String>, is_on: bool) -> Self {
        Self::Status {
            hour,
            heat_source: heat_source.into(),
            is_on,
        }
    }

    pub fn temperature(hour: f64, temperature: f64) -> Self {
        Self::Temperature { hour, temperature }
    }

    pub fn hour(&self) -> f64 {
        match self {
            Self::Status { hour, .. } | Self::Temperature { hour, .. } => *hour,
        }
    }
}
