//! Trip lifecycle controller.
//!
//! Owns the single active-trip slot, the movement classifier, the quota and
//! the ledger of completed trips. Every operation is synchronous and takes
//! `&mut self`; callers sharing a controller must serialize access to it.

use chrono::{Datelike, Utc};
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::distance::distance;
use crate::error::Error;
use crate::models::{
    ActiveTrip, Category, CompletedTrip, LocationSample, ManualEntry, MovementState, PlanTier,
    TripEvent, TripId, TripOutcome, TripSummary,
};
use crate::movement::{MovementClassifier, Transition};
use crate::quota::SubscriptionQuota;
use crate::Result;

#[derive(Debug, Clone)]
pub struct TripController {
    config: TrackerConfig,
    classifier: MovementClassifier,
    quota: SubscriptionQuota,
    active: Option<ActiveTrip>,
    trips: Vec<CompletedTrip>,
}

impl TripController {
    #[must_use]
    pub fn new(config: TrackerConfig, quota: SubscriptionQuota) -> Self {
        let classifier = MovementClassifier::new(&config);
        Self { config, classifier, quota, active: None, trips: Vec::new() }
    }

    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[must_use]
    pub const fn movement_state(&self) -> MovementState {
        self.classifier.state()
    }

    #[must_use]
    pub const fn active_trip(&self) -> Option<&ActiveTrip> {
        self.active.as_ref()
    }

    #[must_use]
    pub const fn quota(&self) -> &SubscriptionQuota {
        &self.quota
    }

    pub const fn set_plan(&mut self, plan_tier: PlanTier) {
        self.quota.plan_tier = plan_tier;
    }

    pub const fn reset_period(&mut self) {
        self.quota.reset_period();
    }

    /// Process one location sample, returning the trip events it caused.
    pub fn process_sample(&mut self, sample: LocationSample) -> Vec<TripEvent> {
        if !sample.is_valid() {
            warn!(
                latitude = sample.latitude,
                longitude = sample.longitude,
                "ignoring invalid location sample"
            );
            return Vec::new();
        }

        let transition = self.classifier.observe(sample);

        match transition {
            Some(transition) if transition.is_departure() => {
                self.on_departure(&transition).into_iter().collect()
            }
            Some(transition) if transition.is_arrival() => {
                self.on_arrival(&transition).into_iter().collect()
            }
            _ => {
                if let Some(active) = self.active.as_mut()
                    && !active.record(sample)
                {
                    debug!(
                        trip_id = %active.id,
                        timestamp = %sample.timestamp,
                        "out-of-order sample left off the route"
                    );
                }
                Vec::new()
            }
        }
    }

    fn on_departure(&mut self, transition: &Transition) -> Option<TripEvent> {
        if let Some(active) = self.active.as_mut() {
            debug!(trip_id = %active.id, "departure while a trip is open");
            active.record(transition.sample);
            return None;
        }

        if !self.quota.try_consume(self.config.free_auto_trip_limit) {
            info!(
                monotonic_counter.quota_skipped = 1,
                used = self.quota.auto_trips_used_this_period,
                "automatic trip quota exhausted"
            );
            return None;
        }

        let trip = ActiveTrip::open(transition.sample, true);
        let event = TripEvent::TripOpened {
            id: trip.id,
            start_location: trip.start_location,
            is_automatic: true,
        };
        info!(
            monotonic_counter.trips_opened = 1,
            trip_id = %trip.id,
            speed_mph = transition.speed_mph,
            "automatic trip opened"
        );
        self.active = Some(trip);
        Some(event)
    }

    fn on_arrival(&mut self, transition: &Transition) -> Option<TripEvent> {
        match self.active.as_mut() {
            Some(active) if active.is_automatic => {}
            Some(active) => {
                active.record(transition.sample);
                return None;
            }
            None => return None,
        }
        self.close_automatic(transition.sample)
    }

    // Close the open automatic trip at `end`, keeping it only when long enough.
    fn close_automatic(&mut self, end: LocationSample) -> Option<TripEvent> {
        let mut trip = self.active.take_if(|trip| trip.is_automatic)?;
        if trip.route_samples.last() != Some(&end) {
            trip.record(end);
        }

        let id = trip.id;
        let miles = distance(&trip.start_location, &end);
        let minutes = (end.timestamp - trip.start_time).num_minutes();

        if miles < self.config.min_auto_trip_miles {
            info!(
                monotonic_counter.trips_discarded = 1,
                trip_id = %id,
                miles,
                "automatic trip below minimum distance"
            );
            return Some(TripEvent::TripClosed { id, outcome: TripOutcome::Discarded });
        }

        let completed = CompletedTrip::from_active(trip, end, miles, minutes);
        info!(
            monotonic_counter.trips_completed = 1,
            trip_id = %id,
            miles,
            minutes,
            "automatic trip completed"
        );
        self.trips.push(completed.clone());
        Some(TripEvent::TripClosed { id, outcome: TripOutcome::Completed(completed) })
    }

    /// Stop automatic tracking.
    ///
    /// An open automatic trip is finalized or discarded at the last observed
    /// sample. Manual trips are left open.
    pub fn stop_automatic_tracking(&mut self) -> Option<TripEvent> {
        let end = self
            .classifier
            .last_sample()
            .copied()
            .or_else(|| self.active.as_ref().map(|trip| trip.start_location));
        let event = end.and_then(|end| self.close_automatic(end));
        self.classifier.reset();
        event
    }

    /// Open a manual trip at `location`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when a trip is already open and `InvalidInput`
    /// when the location is not a valid coordinate.
    pub fn start_manual_trip(&mut self, location: LocationSample) -> Result<TripId> {
        if !location.is_valid() {
            return Err(Error::InvalidInput("start location out of range".to_string()));
        }
        if let Some(active) = &self.active {
            return Err(Error::InvalidState(format!("trip {} already in progress", active.id)));
        }

        let trip = ActiveTrip::open(location, false);
        let id = trip.id;
        info!(monotonic_counter.trips_opened = 1, trip_id = %id, "manual trip opened");
        self.active = Some(trip);
        Ok(id)
    }

    /// Close the manual trip `id` at `location`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when no manual trip with this id is open.
    pub fn stop_manual_trip(
        &mut self, id: TripId, location: LocationSample,
    ) -> Result<CompletedTrip> {
        let Some(mut trip) = self.active.take_if(|trip| !trip.is_automatic && trip.id == id) else {
            return Err(Error::InvalidState(format!("no manual trip {id} in progress")));
        };
        trip.record(location);

        let miles = distance(&trip.start_location, &location).max(self.config.manual_min_miles);
        let minutes = (location.timestamp - trip.start_time)
            .num_minutes()
            .max(self.config.manual_min_minutes);

        let completed = CompletedTrip::from_active(trip, location, miles, minutes);
        info!(
            monotonic_counter.trips_completed = 1,
            trip_id = %id,
            miles,
            minutes,
            "manual trip completed"
        );
        self.trips.push(completed.clone());
        Ok(completed)
    }

    /// Record a trip entered by hand.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the distance is not a positive number.
    pub fn add_trip(&mut self, entry: ManualEntry) -> Result<CompletedTrip> {
        if !entry.distance.is_finite() || entry.distance <= 0.0 {
            return Err(Error::InvalidInput(format!("invalid distance {}", entry.distance)));
        }

        let mut trip = CompletedTrip {
            id: TripId::new(),
            start_location: None,
            end_location: None,
            start_label: Some(entry.start_label),
            end_label: Some(entry.end_label),
            distance: entry.distance,
            duration: 0,
            category: Category::Uncategorized,
            cost_deduction: 0.0,
            is_automatic: false,
            date: entry.date,
            notes: entry.notes.filter(|notes| !notes.trim().is_empty()),
            route: Vec::new(),
        };
        trip.recategorize(entry.category);

        debug!(trip_id = %trip.id, miles = trip.distance, "manual entry recorded");
        self.trips.push(trip.clone());
        Ok(trip)
    }

    /// Change a completed trip's category and recompute its deduction.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no completed trip has this id.
    pub fn recategorize(&mut self, id: TripId, category: Category) -> Result<CompletedTrip> {
        let trip = self.trip_mut(id)?;
        trip.recategorize(category);
        debug!(
            trip_id = %id,
            category = %category,
            cost = trip.cost_deduction,
            "trip recategorized"
        );
        Ok(trip.clone())
    }

    /// Attach reverse-geocoded labels to a completed trip.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no completed trip has this id.
    pub fn label_trip(
        &mut self, id: TripId, start_label: String, end_label: String,
    ) -> Result<CompletedTrip> {
        let trip = self.trip_mut(id)?;
        trip.start_label = Some(start_label);
        trip.end_label = Some(end_label);
        Ok(trip.clone())
    }

    #[must_use]
    pub fn trip(&self, id: TripId) -> Option<&CompletedTrip> {
        self.trips.iter().find(|trip| trip.id == id)
    }

    /// Completed trips, oldest first.
    #[must_use]
    pub fn trips(&self) -> &[CompletedTrip] {
        &self.trips
    }

    #[must_use]
    pub fn summary(&self) -> TripSummary {
        self.trips.iter().collect()
    }

    /// Totals for trips dated in the given calendar month, local time.
    #[must_use]
    pub fn monthly_summary(&self, year: i32, month: u32) -> TripSummary {
        let tz = self.config.timezone;
        self.trips
            .iter()
            .filter(|trip| {
                let local = trip.date.with_timezone(&tz);
                local.year() == year && local.month() == month
            })
            .collect()
    }

    /// Totals for the current calendar month, local time.
    #[must_use]
    pub fn current_month_summary(&self) -> TripSummary {
        let now = Utc::now().with_timezone(&self.config.timezone);
        self.monthly_summary(now.year(), now.month())
    }

    fn trip_mut(&mut self, id: TripId) -> Result<&mut CompletedTrip> {
        self.trips
            .iter_mut()
            .find(|trip| trip.id == id)
            .ok_or_else(|| Error::NotFound(format!("trip {id}")))
    }
}

impl Default for TripController {
    fn default() -> Self {
        Self::new(TrackerConfig::default(), SubscriptionQuota::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::distance::EARTH_RADIUS_MILES;

    fn epoch() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    // A fix `miles` north of the origin, `secs` after the epoch.
    fn at(miles: f64, secs: i64) -> LocationSample {
        LocationSample::new(
            40.0 + (miles / EARTH_RADIUS_MILES).to_degrees(),
            -75.0,
            epoch() + Duration::seconds(secs),
        )
    }

    // Seed the classifier and depart; the trip starts at 0.2 mi, t=0.
    fn depart(controller: &mut TripController) -> Vec<TripEvent> {
        assert!(controller.process_sample(at(0.0, -60)).is_empty());
        controller.process_sample(at(0.2, 0))
    }

    fn opened(events: &[TripEvent]) -> TripId {
        match events {
            [TripEvent::TripOpened { id, is_automatic: true, .. }] => *id,
            other => panic!("expected a single automatic open, got {other:?}"),
        }
    }

    // Should discard an automatic trip shorter than half a mile.
    #[test]
    fn short_trip_discarded() {
        let mut controller = TripController::default();
        let id = opened(&depart(&mut controller));

        // 0.3 mi from the start, then parked
        controller.process_sample(at(0.5, 300));
        let events = controller.process_sample(at(0.5, 600));

        assert_eq!(events, vec![TripEvent::TripClosed { id, outcome: TripOutcome::Discarded }]);
        assert!(controller.active_trip().is_none());
        assert!(controller.trips().is_empty());
        assert_eq!(controller.movement_state(), MovementState::Stationary);
    }

    #[test]
    fn trip_completed() {
        let mut controller = TripController::default();
        let id = opened(&depart(&mut controller));

        controller.process_sample(at(2.2, 300));
        let events = controller.process_sample(at(2.2, 360));

        let [TripEvent::TripClosed { id: closed, outcome: TripOutcome::Completed(trip) }] =
            events.as_slice()
        else {
            panic!("expected a completed trip, got {events:?}");
        };
        assert_eq!(*closed, id);
        assert!((trip.distance - 2.0).abs() < 1e-6);
        assert_eq!(trip.duration, 6);
        assert_eq!(trip.category, Category::Uncategorized);
        assert!(trip.cost_deduction.abs() < f64::EPSILON);
        assert!(trip.is_automatic);
        assert_eq!(trip.route.first(), Some(&at(0.2, 0)));
        assert_eq!(trip.route.last(), Some(&at(2.2, 360)));
        assert_eq!(controller.trips().len(), 1);
        assert!(controller.active_trip().is_none());
    }

    // Should skip the automatic start when the free quota is used up.
    #[test]
    fn quota_exhausted() {
        let quota = SubscriptionQuota::new(PlanTier::Free, 25);
        let mut controller = TripController::new(TrackerConfig::default(), quota);

        assert!(depart(&mut controller).is_empty());
        assert!(controller.active_trip().is_none());
        assert_eq!(controller.quota().auto_trips_used_this_period, 25);
        assert_eq!(controller.movement_state(), MovementState::Driving);
    }

    #[test]
    fn quota_consumed() {
        let quota = SubscriptionQuota::new(PlanTier::Free, 24);
        let mut controller = TripController::new(TrackerConfig::default(), quota);
        opened(&depart(&mut controller));
        assert_eq!(controller.quota().auto_trips_used_this_period, 25);
    }

    #[test]
    fn premium_ignores_limit() {
        let quota = SubscriptionQuota::new(PlanTier::Premium, 500);
        let mut controller = TripController::new(TrackerConfig::default(), quota);
        opened(&depart(&mut controller));
    }

    #[test]
    fn recategorize() {
        let mut controller = TripController::default();
        let start = at(0.0, 0);
        let id = controller.start_manual_trip(start).unwrap();
        let trip = controller.stop_manual_trip(id, at(10.0, 1200)).unwrap();
        assert!((trip.distance - 10.0).abs() < 1e-6);

        let trip = controller.recategorize(id, Category::Business).unwrap();
        assert!((trip.cost_deduction - 7.00).abs() < 1e-9);

        let trip = controller.recategorize(id, Category::Personal).unwrap();
        assert!(trip.cost_deduction.abs() < 1e-9);
        assert_eq!(controller.trip(id).unwrap().category, Category::Personal);
    }

    #[test]
    fn recategorize_unknown() {
        let mut controller = TripController::default();
        let err = controller.recategorize(TripId::new(), Category::Medical).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn stop_without_start() {
        let mut controller = TripController::default();
        let err = controller.stop_manual_trip(TripId::new(), at(1.0, 60)).unwrap_err();
        assert_eq!(err.code(), "invalid_state");
    }

    // Should refuse to stop an automatic trip through the manual API.
    #[test]
    fn manual_stop_of_automatic_trip() {
        let mut controller = TripController::default();
        let id = opened(&depart(&mut controller));
        let err = controller.stop_manual_trip(id, at(3.0, 300)).unwrap_err();
        assert_eq!(err.code(), "invalid_state");
        assert!(controller.active_trip().is_some());
    }

    // Should apply the distance and duration floors to manual trips.
    #[test]
    fn manual_floors() {
        let mut controller = TripController::default();
        let id = controller.start_manual_trip(at(0.0, 0)).unwrap();
        let trip = controller.stop_manual_trip(id, at(0.0, 20)).unwrap();

        assert!((trip.distance - 0.1).abs() < f64::EPSILON);
        assert_eq!(trip.duration, 1);
        assert!(!trip.is_automatic);
    }

    // Should keep a manual trip open through movement transitions.
    #[test]
    fn manual_trip_not_auto_closed() {
        let mut controller = TripController::default();
        controller.process_sample(at(0.0, -60));
        let id = controller.start_manual_trip(at(0.0, -60)).unwrap();

        assert!(controller.process_sample(at(0.2, 0)).is_empty());
        controller.process_sample(at(2.2, 300));
        assert!(controller.process_sample(at(2.2, 360)).is_empty());
        assert_eq!(controller.movement_state(), MovementState::Stationary);

        let trip = controller.stop_manual_trip(id, at(2.2, 420)).unwrap();
        assert_eq!(trip.id, id);
        assert_eq!(trip.duration, 8);
        assert_eq!(trip.route.len(), 5);
        assert_eq!(controller.quota().auto_trips_used_this_period, 0);
    }

    // Should leave a sample older than the route's latest off the route.
    #[test]
    fn route_stays_ordered() {
        let mut controller = TripController::default();
        let id = controller.start_manual_trip(at(0.0, 0)).unwrap();

        controller.process_sample(at(0.05, 60));
        controller.process_sample(at(0.06, 30));
        let trip = controller.stop_manual_trip(id, at(1.0, 120)).unwrap();

        assert_eq!(trip.route, vec![at(0.0, 0), at(0.05, 60), at(1.0, 120)]);
    }

    // Should end a drive on a repeated timestamp and close the trip there.
    #[test]
    fn duplicate_timestamp_closes_trip() {
        let mut controller = TripController::default();
        let id = opened(&depart(&mut controller));
        controller.process_sample(at(2.2, 300));

        let events = controller.process_sample(at(2.3, 300));
        let [TripEvent::TripClosed { id: closed, outcome: TripOutcome::Completed(trip) }] =
            events.as_slice()
        else {
            panic!("expected a completed trip, got {events:?}");
        };
        assert_eq!(*closed, id);
        assert!((trip.distance - 2.1).abs() < 1e-6);
        assert_eq!(controller.movement_state(), MovementState::Stationary);
    }

    #[test]
    fn manual_start_while_active() {
        let mut controller = TripController::default();
        opened(&depart(&mut controller));
        let err = controller.start_manual_trip(at(0.3, 30)).unwrap_err();
        assert_eq!(err.code(), "invalid_state");
    }

    // Should finalize an in-flight automatic trip when tracking stops.
    #[test]
    fn teardown_finalizes() {
        let mut controller = TripController::default();
        let id = opened(&depart(&mut controller));
        controller.process_sample(at(3.2, 240));

        let event = controller.stop_automatic_tracking().expect("should close");
        let TripEvent::TripClosed { id: closed, outcome: TripOutcome::Completed(trip) } = event
        else {
            panic!("expected completion, got {event:?}");
        };
        assert_eq!(closed, id);
        assert!((trip.distance - 3.0).abs() < 1e-6);
        assert!(controller.active_trip().is_none());
        assert_eq!(controller.movement_state(), MovementState::Stationary);
    }

    #[test]
    fn teardown_discards() {
        let mut controller = TripController::default();
        let id = opened(&depart(&mut controller));
        let event = controller.stop_automatic_tracking();
        assert_eq!(event, Some(TripEvent::TripClosed { id, outcome: TripOutcome::Discarded }));
    }

    #[test]
    fn teardown_keeps_manual_trip() {
        let mut controller = TripController::default();
        let id = controller.start_manual_trip(at(0.0, 0)).unwrap();
        assert!(controller.stop_automatic_tracking().is_none());
        assert_eq!(controller.active_trip().map(|trip| trip.id), Some(id));
    }

    #[test]
    fn add_trip() {
        let mut controller = TripController::default();
        let entry = ManualEntry {
            start_label: "123 Home St".to_string(),
            end_label: "456 Office Blvd".to_string(),
            distance: 12.5,
            category: Category::Business,
            notes: Some("Client meeting".to_string()),
            date: epoch(),
        };
        let trip = controller.add_trip(entry.clone()).unwrap();
        assert!((trip.cost_deduction - 8.75).abs() < 1e-9);
        assert_eq!(trip.start_label.as_deref(), Some("123 Home St"));

        let err = controller.add_trip(ManualEntry { distance: -1.0, ..entry }).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(controller.summary().trips, 1);
    }

    #[test]
    fn monthly_summary() {
        let mut controller = TripController::default();
        let entry = |distance: f64, date: DateTime<Utc>| ManualEntry {
            start_label: "A".to_string(),
            end_label: "B".to_string(),
            distance,
            category: Category::Medical,
            notes: None,
            date,
        };
        for (distance, date) in [
            (10.0, Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()),
            (5.0, Utc.with_ymd_and_hms(2024, 3, 28, 9, 0, 0).unwrap()),
            (7.0, Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()),
        ] {
            controller.add_trip(entry(distance, date)).unwrap();
        }

        let march = controller.monthly_summary(2024, 3);
        assert_eq!(march.trips, 2);
        assert!((march.miles - 15.0).abs() < 1e-9);
        assert!((march.deduction - 3.15).abs() < 1e-9);
        assert_eq!(controller.summary().trips, 3);
    }

    #[test]
    fn invalid_sample_ignored() {
        let mut controller = TripController::default();
        let bad = LocationSample::new(f64::NAN, 0.0, epoch());
        assert!(controller.process_sample(bad).is_empty());
        assert!(controller.start_manual_trip(bad).is_err());
    }
}
