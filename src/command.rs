use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trip_tracker::{
    Category, CompletedTrip, Error, FeedError, FeedItem, LocationSample, ManualEntry,
    MovementState, PlanTier, TripId, TripSummary,
};

/// One line of host input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Input {
    Sample(LocationSample),
    Unavailable { error: FeedError },
    StartManual { location: LocationSample },
    StopManual { id: TripId, location: LocationSample },
    Recategorize { id: TripId, category: Category },
    AddTrip(ManualEntry),
    Trips,
    /// Totals for all trips, or for one month when both fields are set.
    Summary { year: Option<i32>, month: Option<u32> },
    /// Tracker state; elapsed time is measured to `at`, defaulting to now.
    Status { at: Option<DateTime<Utc>> },
    SetPlan { plan: PlanTier },
    ResetPeriod,
}

impl Input {
    /// Split feed deliveries from control commands.
    ///
    /// # Errors
    ///
    /// Returns the input unchanged when it is a control command.
    pub fn into_feed_item(self) -> Result<FeedItem, Self> {
        match self {
            Self::Sample(sample) => Ok(FeedItem::Sample(sample)),
            Self::Unavailable { error } => Ok(FeedItem::Unavailable(error)),
            command => Err(command),
        }
    }
}

/// Response to a control command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Reply {
    TripStarted { id: TripId },
    Trip { trip: CompletedTrip },
    Trips { trips: Vec<CompletedTrip> },
    Summary { summary: TripSummary },
    #[serde(rename_all = "camelCase")]
    Status {
        state: MovementState,
        #[serde(skip_serializing_if = "Option::is_none")]
        active_trip: Option<TripId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        elapsed: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        quota_remaining: Option<u32>,
    },
    Ok,
    Error { code: String, description: String },
}

impl Reply {
    /// Reply with a single trip, its deduction in cents.
    #[must_use]
    pub fn trip(trip: CompletedTrip) -> Self {
        Self::Trip { trip: in_cents(trip) }
    }

    #[must_use]
    pub fn trips(trips: Vec<CompletedTrip>) -> Self {
        Self::Trips { trips: trips.into_iter().map(in_cents).collect() }
    }

    /// Reply with totals, the deduction rounded once after summing.
    #[must_use]
    pub fn summary(summary: TripSummary) -> Self {
        let deduction = round_cents(summary.deduction);
        Self::Summary { summary: TripSummary { deduction, ..summary } }
    }
}

fn in_cents(trip: CompletedTrip) -> CompletedTrip {
    CompletedTrip { cost_deduction: round_cents(trip.cost_deduction), ..trip }
}

fn round_cents(dollars: f64) -> f64 {
    (dollars * 100.0).round() / 100.0
}

impl From<Error> for Reply {
    fn from(err: Error) -> Self {
        Self::Error { code: err.code().to_string(), description: err.description() }
    }
}
