//! Piecewise contribution curve of one activity.
//!
//! A [`ContributionCurve`] is the single parameterized description of the
//! warm-up / plateau / decay trapezoid of an activity for a given inertia. Both
//! the numeric factor and the textual closed form are derived from it, so the
//! two always describe the same function.
//!
//! ```text
//!  1 ┤      ┌──────────┐
//!    │     /            \
//!    │    /              \
//!  0 ┼───┘                └────────
//!      start  +inertia   end  end+decay_time
//! ```

use super::hour::HOURS_PER_DAY;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContributionCurve {
    start_hour: f64,
    end_hour: f64,
    inertia_duration: f64,
    decay_time: f64,
}

impl ContributionCurve {
    /// Build the curve of a validated activity window for a validated inertia.
    pub(crate) fn new(start_hour: f64, end_hour: f64, inertia_duration: f64) -> Self {
        Self {
            start_hour,
            end_hour,
            inertia_duration,
            decay_time: inertia_duration.min(end_hour - start_hour),
        }
    }

    /// Time it takes the contribution to fall back to zero once the activity stops.
    pub fn decay_time(&self) -> f64 {
        self.decay_time
    }

    /// Hour (possibly beyond 24) at which the decay reaches zero.
    pub fn decay_origin(&self) -> f64 {
        self.decay_time + self.end_hour
    }

    /// Peak reached at the end of the activity, below 1 when it never fully warmed up.
    pub fn startup_ratio(&self) -> f64 {
        self.decay_time / self.inertia_duration
    }

    /// Whether the curve is in its on-regime (closed window) at `hour`.
    pub fn is_on(&self, hour: f64) -> bool {
        self.start_hour <= hour && hour <= self.end_hour
    }

    /// Contribution factor in `[0, 1]` at a valid day hour.
    pub fn factor(&self, hour: f64) -> f64 {
        if self.is_on(hour) {
            return (hour - self.start_hour).min(self.inertia_duration) / self.inertia_duration;
        }

        // decay carried over from the previous cycle
        let hour = if hour < self.start_hour {
            hour + HOURS_PER_DAY
        } else {
            hour
        };
        let decay_ratio = (self.decay_origin() - hour).max(0.0) / self.decay_time;
        (self.startup_ratio() * decay_ratio).max(0.0)
    }

    /// Closed-form expression of [`factor`](Self::factor), `t` being the hour of the day.
    pub fn formula(&self) -> String {
        let decay_ratio = format!(
            "max(0, {origin} - t - ((t < {start}) ? 24 : 0))/{decay}",
            origin = self.decay_origin(),
            start = self.start_hour,
            decay = self.decay_time,
        );
        let off_factor = if self.decay_time < self.inertia_duration {
            format!("({}/{})*{}", self.decay_time, self.inertia_duration, decay_ratio)
        } else {
            decay_ratio
        };

        format!(
            "({start} <= t and t <= {end}) ? min(t - {start}, {inertia})/{inertia} : {off}",
            start = self.start_hour,
            end = self.end_hour,
            inertia = self.inertia_duration,
            off = off_factor,
        )
    }
}
