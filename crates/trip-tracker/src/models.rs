//! Trip tracking data model.

use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// A resolved location fix delivered by the sample feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Time the fix was taken.
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self { latitude, longitude, timestamp }
    }

    /// Whether the coordinates are finite and within WGS84 bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Current movement state as judged by the classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MovementState {
    #[default]
    Stationary,
    Driving,
}

impl Display for MovementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stationary => f.write_str("stationary"),
            Self::Driving => f.write_str("driving"),
        }
    }
}

/// IRS deduction category for a completed trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Business,
    Medical,
    Charity,
    Personal,
    #[default]
    Uncategorized,
}

impl Category {
    /// Deduction rate in dollars per mile.
    #[must_use]
    pub const fn rate_per_mile(self) -> f64 {
        match self {
            Self::Business => 0.70,
            Self::Medical => 0.21,
            Self::Charity => 0.14,
            Self::Personal | Self::Uncategorized => 0.0,
        }
    }

    /// Deduction for `miles` at this category's rate, unrounded.
    #[must_use]
    pub const fn deduction(self, miles: f64) -> f64 {
        miles * self.rate_per_mile()
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Business => "Business",
            Self::Medical => "Medical",
            Self::Charity => "Charity",
            Self::Personal => "Personal",
            Self::Uncategorized => "Uncategorized",
        };
        f.write_str(name)
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "business" => Ok(Self::Business),
            "medical" => Ok(Self::Medical),
            "charity" => Ok(Self::Charity),
            "personal" => Ok(Self::Personal),
            "uncategorized" => Ok(Self::Uncategorized),
            other => Err(Error::InvalidInput(format!("unknown category {other}"))),
        }
    }
}

/// Subscription plan governing automatic trip starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanTier {
    #[default]
    Free,
    Premium,
}

impl FromStr for PlanTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            other => Err(Error::InvalidInput(format!("unknown plan tier {other}"))),
        }
    }
}

/// Unique trip identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(Uuid);

impl TripId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TripId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TripId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|err| Error::InvalidInput(format!("invalid trip id {s}: {err}")))
    }
}

/// A trip currently being recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTrip {
    pub id: TripId,
    pub start_time: DateTime<Utc>,
    pub start_location: LocationSample,
    /// Samples observed while the trip was open, oldest first.
    pub route_samples: Vec<LocationSample>,
    pub is_automatic: bool,
}

impl ActiveTrip {
    #[must_use]
    pub fn open(start_location: LocationSample, is_automatic: bool) -> Self {
        Self {
            id: TripId::new(),
            start_time: start_location.timestamp,
            start_location,
            route_samples: vec![start_location],
            is_automatic,
        }
    }

    /// Append `sample` to the route unless it predates the latest one.
    pub fn record(&mut self, sample: LocationSample) -> bool {
        if self.route_samples.last().is_some_and(|last| sample.timestamp < last.timestamp) {
            return false;
        }
        self.route_samples.push(sample);
        true
    }
}

/// A finalized trip.
///
/// Only `category` and `cost_deduction` change after completion (via
/// recategorization), along with the location labels filled in by reverse
/// geocoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTrip {
    pub id: TripId,
    /// Absent for trips entered by hand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_location: Option<LocationSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_location: Option<LocationSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_label: Option<String>,
    /// Distance in miles.
    pub distance: f64,
    /// Duration in whole minutes.
    pub duration: i64,
    pub category: Category,
    /// Deduction in dollars for the current category.
    pub cost_deduction: f64,
    pub is_automatic: bool,
    /// When the trip ended.
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route: Vec<LocationSample>,
}

impl CompletedTrip {
    /// Finalize an active trip at `end`, uncategorized with no deduction.
    #[must_use]
    pub fn from_active(
        trip: ActiveTrip, end: LocationSample, distance: f64, duration: i64,
    ) -> Self {
        Self {
            id: trip.id,
            start_location: Some(trip.start_location),
            end_location: Some(end),
            start_label: None,
            end_label: None,
            distance,
            duration,
            category: Category::Uncategorized,
            cost_deduction: 0.0,
            is_automatic: trip.is_automatic,
            date: end.timestamp,
            notes: None,
            route: trip.route_samples,
        }
    }

    /// Set the category and recompute the deduction.
    pub fn recategorize(&mut self, category: Category) {
        self.category = category;
        self.cost_deduction = category.deduction(self.distance);
    }
}

/// A trip typed in by the user rather than recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntry {
    pub start_label: String,
    pub end_label: String,
    /// Distance in miles.
    pub distance: f64,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

/// Final disposition of a closed trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TripOutcome {
    Completed(CompletedTrip),
    Discarded,
}

/// Structured events emitted to persistence and UI collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TripEvent {
    #[serde(rename_all = "camelCase")]
    TripOpened { id: TripId, start_location: LocationSample, is_automatic: bool },
    #[serde(rename_all = "camelCase")]
    TripClosed { id: TripId, outcome: TripOutcome },
}

impl TripEvent {
    #[must_use]
    pub const fn id(&self) -> TripId {
        match self {
            Self::TripOpened { id, .. } | Self::TripClosed { id, .. } => *id,
        }
    }
}

/// Aggregate totals over recorded trips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSummary {
    pub trips: usize,
    pub miles: f64,
    pub deduction: f64,
}

impl<'a> FromIterator<&'a CompletedTrip> for TripSummary {
    fn from_iter<I: IntoIterator<Item = &'a CompletedTrip>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |mut acc, trip| {
            acc.trips += 1;
            acc.miles += trip.distance;
            acc.deduction += trip.cost_deduction;
            acc
        })
    }
}
