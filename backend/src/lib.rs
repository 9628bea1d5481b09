//! # Watts
//!
//! Thermal model of a facility and streaming regression monitor.
//!
//! A facility is an idle temperature plus the weighted contributions of heat
//! sources that warm up and cool down with inertia around their activity
//! periods. Probe readings (temperatures and heat source statuses sampled at
//! random hours) are aggregated into hourly lapse samples, and a regression
//! model of the temperature on the heat source statuses is recomputed with at
//! most one request in flight.
//!
//! ## Architecture
//!
//! - [`models`]: thermal model (activities, heat sources, facility) and its closed-form formula
//! - [`monitoring`]: probe readings, lapse sample aggregation, regression admission and sessions
//! - [`regression`]: request/response protocol and the in-process ridge regression service
//! - [`config`]: TOML configuration
//! - [`http`]: Axum-based HTTP server, SSE event stream
//!

pub mod config;
pub mod models;
pub mod monitoring;
pub mod regression;

#[cfg(feature = "http-server")]
pub mod http;
