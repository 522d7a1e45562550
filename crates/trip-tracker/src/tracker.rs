//! Trip tracking service.
//!
//! Wraps a [`TripController`] behind a single lock so that samples from the
//! feed and manual control from the user are serialized. Reverse geocoding
//! and publication happen after the controller lock is released; a slow
//! geocoder delays labels, never finalization.
//!
//! Operations that publish hold a second, outer lock from the state change
//! until their events are sent, so collaborators see events in the order the
//! controller produced them. It is always taken before the controller lock.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::config::TrackerConfig;
use crate::controller::TripController;
use crate::error::Error;
use crate::feed::{FeedItem, LocationFeed};
use crate::models::{
    ActiveTrip, Category, CompletedTrip, LocationSample, ManualEntry, MovementState, PlanTier,
    TripEvent, TripId, TripOutcome, TripSummary,
};
use crate::provider::Provider;
use crate::quota::SubscriptionQuota;
use crate::Result;

pub struct Tracker<P> {
    controller: Arc<Mutex<TripController>>,
    publishing: Arc<Mutex<()>>,
    provider: Arc<P>,
    config: TrackerConfig,
}

impl<P> Clone for Tracker<P> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            publishing: Arc::clone(&self.publishing),
            provider: Arc::clone(&self.provider),
            config: self.config.clone(),
        }
    }
}

impl<P: Provider> Tracker<P> {
    #[must_use]
    pub fn new(config: TrackerConfig, quota: SubscriptionQuota, provider: P) -> Self {
        let controller = TripController::new(config.clone(), quota);
        Self {
            controller: Arc::new(Mutex::new(controller)),
            publishing: Arc::new(Mutex::new(())),
            provider: Arc::new(provider),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Consume `feed` until it ends or `shutdown` resolves.
    ///
    /// Automatic tracking is torn down before returning, finalizing or
    /// discarding any open automatic trip.
    ///
    /// # Errors
    ///
    /// Returns `FeedUnavailable` when the provider reports it can no longer
    /// deliver samples.
    pub async fn run<F, S>(&self, feed: &mut F, shutdown: S) -> Result<()>
    where
        F: LocationFeed,
        S: Future<Output = ()> + Send,
    {
        info!("automatic tracking started");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("automatic tracking stop requested");
                    break;
                }
                item = feed.next() => match item {
                    Some(FeedItem::Sample(sample)) => self.process_sample(sample).await,
                    Some(FeedItem::Unavailable(reason)) => {
                        error!(
                            monotonic_counter.feed_errors = 1,
                            reason = %reason,
                            "location feed unavailable"
                        );
                        self.stop_automatic_tracking().await;
                        return Err(Error::FeedUnavailable(reason.to_string()));
                    }
                    None => {
                        info!("location feed ended");
                        break;
                    }
                },
            }
        }

        self.stop_automatic_tracking().await;
        Ok(())
    }

    /// Process a single sample and publish the events it causes.
    pub async fn process_sample(&self, sample: LocationSample) {
        let _publishing = self.publishing.lock().await;
        let events = self.lock().await.process_sample(sample);
        for event in events {
            self.dispatch(event).await;
        }
    }

    /// Tear down automatic tracking, closing any open automatic trip.
    pub async fn stop_automatic_tracking(&self) {
        let _publishing = self.publishing.lock().await;
        let event = self.lock().await.stop_automatic_tracking();
        if let Some(event) = event {
            self.dispatch(event).await;
        }
        info!("automatic tracking stopped");
    }

    /// Open a manual trip.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when a trip is already in progress.
    pub async fn start_manual_trip(&self, location: LocationSample) -> Result<TripId> {
        let _publishing = self.publishing.lock().await;
        let id = self.lock().await.start_manual_trip(location)?;
        let event = TripEvent::TripOpened { id, start_location: location, is_automatic: false };
        self.publish(&event).await;
        Ok(id)
    }

    /// Close a manual trip.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when no manual trip with this id is open.
    pub async fn stop_manual_trip(
        &self, id: TripId, location: LocationSample,
    ) -> Result<CompletedTrip> {
        let _publishing = self.publishing.lock().await;
        let trip = self.lock().await.stop_manual_trip(id, location)?;
        let trip = self.label(trip).await;
        let event = TripEvent::TripClosed { id, outcome: TripOutcome::Completed(trip.clone()) };
        self.publish(&event).await;
        Ok(trip)
    }

    /// Change a completed trip's category.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the trip does not exist.
    pub async fn recategorize(&self, id: TripId, category: Category) -> Result<CompletedTrip> {
        self.lock().await.recategorize(id, category)
    }

    /// Record a trip entered by hand.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the entry is malformed.
    pub async fn add_trip(&self, entry: ManualEntry) -> Result<CompletedTrip> {
        self.lock().await.add_trip(entry)
    }

    pub async fn trips(&self) -> Vec<CompletedTrip> {
        self.lock().await.trips().to_vec()
    }

    pub async fn summary(&self) -> TripSummary {
        self.lock().await.summary()
    }

    pub async fn monthly_summary(&self, year: i32, month: u32) -> TripSummary {
        self.lock().await.monthly_summary(year, month)
    }

    pub async fn active_trip(&self) -> Option<ActiveTrip> {
        self.lock().await.active_trip().cloned()
    }

    pub async fn movement_state(&self) -> MovementState {
        self.lock().await.movement_state()
    }

    pub async fn quota(&self) -> SubscriptionQuota {
        *self.lock().await.quota()
    }

    pub async fn set_plan(&self, plan_tier: PlanTier) {
        self.lock().await.set_plan(plan_tier);
    }

    pub async fn reset_period(&self) {
        self.lock().await.reset_period();
    }

    async fn lock(&self) -> MutexGuard<'_, TripController> {
        self.controller.lock().await
    }

    async fn dispatch(&self, event: TripEvent) {
        let event = match event {
            TripEvent::TripClosed { id, outcome: TripOutcome::Completed(trip) } => {
                let trip = self.label(trip).await;
                TripEvent::TripClosed { id, outcome: TripOutcome::Completed(trip) }
            }
            other => other,
        };
        self.publish(&event).await;
    }

    // Resolve both endpoint labels and store them on the ledger entry.
    async fn label(&self, trip: CompletedTrip) -> CompletedTrip {
        let (Some(start), Some(end)) = (trip.start_location, trip.end_location) else {
            return trip;
        };
        let (start_label, end_label) =
            tokio::join!(self.resolve_label(&start), self.resolve_label(&end));

        match self.lock().await.label_trip(trip.id, start_label.clone(), end_label.clone()) {
            Ok(labelled) => labelled,
            Err(err) => {
                warn!(trip_id = %trip.id, error = %err, "labelled trip missing from ledger");
                CompletedTrip { start_label: Some(start_label), end_label: Some(end_label), ..trip }
            }
        }
    }

    async fn resolve_label(&self, location: &LocationSample) -> String {
        let limit = self.config.geocode_timeout;
        match timeout(limit, self.provider.reverse_geocode(location)).await {
            Ok(Ok(label)) => label,
            Ok(Err(err)) => {
                warn!(
                    monotonic_counter.geocode_failures = 1,
                    error = %err,
                    "reverse geocoding failed"
                );
                self.config.placeholder_label.clone()
            }
            Err(_elapsed) => {
                warn!(
                    monotonic_counter.geocode_failures = 1,
                    timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    "reverse geocoding timed out"
                );
                self.config.placeholder_label.clone()
            }
        }
    }

    async fn publish(&self, event: &TripEvent) {
        if let Err(err) = self.provider.send(event).await {
            error!(
                monotonic_counter.processing_errors = 1,
                trip_id = %event.id(),
                error = %err,
                "failed to publish trip event"
            );
        }
    }
}
