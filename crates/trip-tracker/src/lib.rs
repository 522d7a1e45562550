//! # Trip Tracker
//!
//! Detects vehicle trips from periodic location samples and records them for
//! mileage deduction.
//!
//! Samples flow through the speed estimator and movement classifier into the
//! trip lifecycle controller, which opens and closes trips and emits
//! [`TripEvent`]s for persistence and UI collaborators.

pub mod config;
pub mod controller;
pub mod distance;
pub mod feed;
pub mod models;
pub mod movement;
pub mod provider;
pub mod quota;
pub mod speed;
pub mod tracker;

mod error;

pub use self::config::TrackerConfig;
pub use self::controller::TripController;
pub use self::error::Error;
pub use self::feed::{FeedError, FeedItem, LocationFeed};
pub use self::models::*;
pub use self::movement::{MovementClassifier, Transition};
pub use self::provider::{Geocoder, Provider, Publisher};
pub use self::quota::SubscriptionQuota;
pub use self::tracker::Tracker;

/// Result type for trip tracking operations.
pub type Result<T> = anyhow::Result<T, Error>;
