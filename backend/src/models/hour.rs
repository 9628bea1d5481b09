//! Hours of the generic 24-hour cycle.

use super::error::{ErrorContext, ModelError, ModelResult};

/// Number of hours in the modelled daily cycle.
pub const HOURS_PER_DAY: f64 = 24.0;

pub const HOUR_OUT_OF_RANGE: &str = "hour must be in [0, 24[";

/// True for finite values in `[0, 24[`.
pub fn is_day_hour(value: f64) -> bool {
    value.is_finite() && (0.0..HOURS_PER_DAY).contains(&value)
}

/// Check that a query hour lies within the cycle.
pub fn ensure_day_hour(hour: f64, operation: &str) -> ModelResult<f64> {
    if is_day_hour(hour) {
        Ok(hour)
    } else {
        Err(ModelError::domain(HOUR_OUT_OF_RANGE)
            .with_context(ErrorContext::new(operation).with_details(format!("hour={}", hour))))
    }
}

/// Hour bucket of the cycle, in `[0, 23]`.
pub fn bucket_of(hour: f64) -> ModelResult<u8> {
    let hour = ensure_day_hour(hour, "bucket_of")?;
    Ok(hour.floor() as u8)
}
