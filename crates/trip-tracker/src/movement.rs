//! Movement classification.
//!
//! A two-state machine fed one sample at a time. The gap between the start
//! and stop speeds is a hysteresis band: speeds inside it never change the
//! state, so stop-and-go traffic and GPS jitter do not flap between states.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TrackerConfig;
use crate::distance::distance;
use crate::models::{LocationSample, MovementState};
use crate::speed::{elapsed_hours, speed};

/// A change of movement state caused by `sample`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub from: MovementState,
    pub to: MovementState,
    pub sample: LocationSample,
    pub speed_mph: f64,
    pub distance_miles: f64,
}

impl Transition {
    #[must_use]
    pub fn is_departure(&self) -> bool {
        self.from == MovementState::Stationary && self.to == MovementState::Driving
    }

    #[must_use]
    pub fn is_arrival(&self) -> bool {
        self.from == MovementState::Driving && self.to == MovementState::Stationary
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Thresholds {
    start_speed_mph: f64,
    start_distance_miles: f64,
    stop_speed_mph: f64,
}

#[derive(Debug, Clone)]
pub struct MovementClassifier {
    thresholds: Thresholds,
    state: MovementState,
    previous: Option<LocationSample>,
}

impl MovementClassifier {
    #[must_use]
    pub const fn new(config: &TrackerConfig) -> Self {
        let thresholds = Thresholds {
            start_speed_mph: config.start_speed_mph,
            start_distance_miles: config.start_distance_miles,
            stop_speed_mph: config.stop_speed_mph,
        };
        Self { thresholds, state: MovementState::Stationary, previous: None }
    }

    #[must_use]
    pub const fn state(&self) -> MovementState {
        self.state
    }

    /// Most recent sample observed.
    #[must_use]
    pub const fn last_sample(&self) -> Option<&LocationSample> {
        self.previous.as_ref()
    }

    /// Evaluate one sample, returning the transition it caused, if any.
    ///
    /// The first sample only seeds the classifier. A sample that does not
    /// move the clock forward has zero speed, so it ends a drive.
    pub fn observe(&mut self, sample: LocationSample) -> Option<Transition> {
        let Some(previous) = self.previous else {
            self.previous = Some(sample);
            return None;
        };

        if elapsed_hours(&previous, &sample) <= 0.0 {
            debug!(
                previous = %previous.timestamp,
                current = %sample.timestamp,
                "sample does not advance time"
            );
        }

        let distance_miles = distance(&previous, &sample);
        let speed_mph = speed(&previous, &sample);
        self.previous = Some(sample);

        let next = match self.state {
            MovementState::Stationary
                if speed_mph > self.thresholds.start_speed_mph
                    && distance_miles > self.thresholds.start_distance_miles =>
            {
                MovementState::Driving
            }
            MovementState::Driving if speed_mph < self.thresholds.stop_speed_mph => {
                MovementState::Stationary
            }
            current => current,
        };

        if next == self.state {
            return None;
        }

        let transition =
            Transition { from: self.state, to: next, sample, speed_mph, distance_miles };
        debug!(
            from = %transition.from,
            to = %transition.to,
            speed_mph,
            distance_miles,
            "movement state changed"
        );
        self.state = next;
        Some(transition)
    }

    /// Forget all history and return to stationary.
    pub const fn reset(&mut self) {
        self.state = MovementState::Stationary;
        self.previous = None;
    }
}
