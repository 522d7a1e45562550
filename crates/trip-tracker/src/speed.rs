//! Instantaneous speed from consecutive samples.

use crate::distance::distance;
use crate::models::LocationSample;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Hours elapsed from `prev` to `curr`; negative when out of order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn elapsed_hours(prev: &LocationSample, curr: &LocationSample) -> f64 {
    (curr.timestamp - prev.timestamp).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// Speed in miles per hour between two samples.
///
/// Returns `0.0` when no time has elapsed or the samples arrive out of order,
/// since feeds may deliver non-monotonic timestamps.
#[must_use]
pub fn speed(prev: &LocationSample, curr: &LocationSample) -> f64 {
    let hours = elapsed_hours(prev, curr);
    if hours <= 0.0 {
        return 0.0;
    }
    distance(prev, curr) / hours
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::distance::EARTH_RADIUS_MILES;

    #[test]
    fn same_timestamp() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let a = LocationSample::new(40.0, -75.0, ts);
        let b = LocationSample::new(40.5, -75.0, ts);
        assert!(speed(&a, &b).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_order() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let a = LocationSample::new(40.0, -75.0, ts);
        let b = LocationSample::new(40.5, -75.0, ts - Duration::seconds(30));
        assert!(speed(&a, &b).abs() < f64::EPSILON);
    }

    // Should report 60 mph for one mile in one minute.
    #[test]
    fn one_mile_per_minute() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let a = LocationSample::new(40.0, -75.0, ts);
        let b = LocationSample::new(
            40.0 + (1.0 / EARTH_RADIUS_MILES).to_degrees(),
            -75.0,
            ts + Duration::seconds(60),
        );
        assert!((speed(&a, &b) - 60.0).abs() < 1e-6);
    }
}
