//! # Sample Feed
//!
//! Pull-based source of location samples. The tracker drains a feed one item
//! at a time, so a sample is fully processed before the next is read. Gaps in
//! the feed are not interpreted: no samples means no transitions.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::LocationSample;

/// Reasons a location provider stops delivering samples.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "camelCase")]
pub enum FeedError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location provider unavailable: {0}")]
    ProviderUnavailable(String),
}

/// One delivery from the location provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedItem {
    Sample(LocationSample),
    Unavailable(FeedError),
}

impl From<LocationSample> for FeedItem {
    fn from(sample: LocationSample) -> Self {
        Self::Sample(sample)
    }
}

/// Source of feed items, read sequentially.
pub trait LocationFeed: Send {
    /// Wait for the next item; `None` once the feed has ended.
    fn next(&mut self) -> impl Future<Output = Option<FeedItem>> + Send;
}

impl LocationFeed for mpsc::Receiver<FeedItem> {
    async fn next(&mut self) -> Option<FeedItem> {
        self.recv().await
    }
}

impl LocationFeed for mpsc::UnboundedReceiver<FeedItem> {
    async fn next(&mut self) -> Option<FeedItem> {
        self.recv().await
    }
}

/// Replays a fixed sequence of items.
impl LocationFeed for VecDeque<FeedItem> {
    async fn next(&mut self) -> Option<FeedItem> {
        self.pop_front()
    }
}
