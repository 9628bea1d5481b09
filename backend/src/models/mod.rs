//! Facility thermal model: activities, heat sources and facilities.

pub mod activity;
pub mod curve;
pub mod demo;
pub mod error;
pub mod facility;
pub mod heat_source;
pub mod hour;
pub mod macros;

pub use activity::Activity;
pub use curve::ContributionCurve;
pub use demo::demo_facility;
pub use error::{ErrorContext, ModelError, ModelResult};
pub use facility::{Facility, FacilityHeatSource};
pub use heat_source::HeatSource;
pub use hour::{bucket_of, is_day_hour, HOURS_PER_DAY};
