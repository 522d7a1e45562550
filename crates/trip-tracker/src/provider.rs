//! # Provider
//!
//! Provider defines external collaborator interfaces for the crate.

use anyhow::Result;

use crate::models::{LocationSample, TripEvent};

/// Provider entry point implemented by the host application.
pub trait Provider: Geocoder + Publisher {}

/// The `Geocoder` trait resolves a human-readable label for a location.
pub trait Geocoder: Send + Sync {
    /// Look up an address or place name for `location`.
    fn reverse_geocode(
        &self, location: &LocationSample,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// The `Publisher` trait delivers trip events to persistence and UI.
pub trait Publisher: Send + Sync {
    /// Publish a single event.
    fn send(&self, event: &TripEvent) -> impl Future<Output = Result<()>> + Send;
}
