//! Great-circle distance between location samples.

use crate::models::LocationSample;

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Haversine distance in miles between two samples.
///
/// Symmetric in its arguments; identical coordinates yield `0.0`.
#[must_use]
pub fn distance(a: &LocationSample, b: &LocationSample) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    EARTH_RADIUS_MILES * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn sample(latitude: f64, longitude: f64) -> LocationSample {
        LocationSample::new(latitude, longitude, Utc.timestamp_opt(0, 0).unwrap())
    }

    #[test]
    fn identical_points() {
        let a = sample(37.7749, -122.4194);
        assert!(distance(&a, &a).abs() < f64::EPSILON);
    }

    #[test]
    fn symmetric() {
        let pairs = [
            (sample(37.7749, -122.4194), sample(34.0522, -118.2437)),
            (sample(-33.8688, 151.2093), sample(51.5074, -0.1278)),
            (sample(0.0, 179.9), sample(0.0, -179.9)),
        ];
        for (a, b) in pairs {
            assert!((distance(&a, &b) - distance(&b, &a)).abs() < 1e-9);
        }
    }

    // Should match the arc length along a meridian.
    #[test]
    fn meridian_arc() {
        let a = sample(40.0, -75.0);
        let b = sample(41.0, -75.0);
        let expected = EARTH_RADIUS_MILES * 1.0_f64.to_radians();
        assert!((distance(&a, &b) - expected).abs() < 1e-6);
    }

    // San Francisco to Los Angeles is roughly 347 miles.
    #[test]
    fn known_distance() {
        let sf = sample(37.7749, -122.4194);
        let la = sample(34.0522, -118.2437);
        let miles = distance(&sf, &la);
        assert!((miles - 347.0).abs() < 2.0, "got {miles}");
    }
}
