use std::env;
use std::time::Duration;

use chrono_tz::Tz;

/// Trip detection tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Speed above which a stationary vehicle is considered driving (mph).
    pub start_speed_mph: f64,
    /// Minimum distance between samples to start driving (miles).
    pub start_distance_miles: f64,
    /// Speed below which a driving vehicle is considered stationary (mph).
    pub stop_speed_mph: f64,
    /// Automatic trips shorter than this are discarded (miles).
    pub min_auto_trip_miles: f64,
    /// Distance floor applied to manual trips (miles).
    pub manual_min_miles: f64,
    /// Duration floor applied to manual trips (minutes).
    pub manual_min_minutes: i64,
    /// Automatic trip starts allowed per period on the free plan.
    pub free_auto_trip_limit: u32,
    /// Upper bound on a reverse geocoding lookup.
    pub geocode_timeout: Duration,
    /// Label used when reverse geocoding fails.
    pub placeholder_label: String,
    /// Timezone used to bucket trips into months.
    pub timezone: Tz,
}

impl TrackerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            start_speed_mph: env_f64("TRIP_START_SPEED_MPH", defaults.start_speed_mph),
            start_distance_miles: env_f64(
                "TRIP_START_DISTANCE_MILES",
                defaults.start_distance_miles,
            ),
            stop_speed_mph: env_f64("TRIP_STOP_SPEED_MPH", defaults.stop_speed_mph),
            min_auto_trip_miles: env_f64("MIN_AUTO_TRIP_MILES", defaults.min_auto_trip_miles),
            manual_min_miles: env_f64("MANUAL_MIN_MILES", defaults.manual_min_miles),
            manual_min_minutes: env_i64("MANUAL_MIN_MINUTES", defaults.manual_min_minutes),
            free_auto_trip_limit: env_u32("FREE_AUTO_TRIP_LIMIT", defaults.free_auto_trip_limit),
            geocode_timeout: env::var("GEOCODE_TIMEOUT_MS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .map_or(defaults.geocode_timeout, Duration::from_millis),
            placeholder_label: env::var("PLACEHOLDER_LABEL")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.placeholder_label),
            timezone: env::var("TIMEZONE")
                .ok()
                .and_then(|value| value.parse::<Tz>().ok())
                .unwrap_or(defaults.timezone),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            start_speed_mph: 5.0,
            start_distance_miles: 0.1,
            stop_speed_mph: 2.0,
            min_auto_trip_miles: 0.5,
            manual_min_miles: 0.1,
            manual_min_minutes: 1,
            free_auto_trip_limit: 25,
            geocode_timeout: Duration::from_secs(3),
            placeholder_label: "Unknown location".to_string(),
            timezone: chrono_tz::UTC,
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key).ok().and_then(|value| value.parse::<i64>().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|value| value.parse::<u32>().ok()).unwrap_or(default)
}
