//! # Mileage
//!
//! Host for the trip tracker. Reads newline-delimited JSON from an input
//! stream: location samples drive automatic tracking while control commands
//! (manual trips, recategorization, summaries) are answered in order. Trip
//! events and command replies are written as JSON lines to the output.

mod command;
mod config;
mod feed;
mod provider;

use std::future;

use anyhow::Result;
use chrono::TimeDelta;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, error};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};
use trip_tracker::{FeedItem, LocationFeed, SubscriptionQuota, Tracker, TrackerConfig};

pub use self::command::{Input, Reply};
pub use self::config::HostConfig;
pub use self::feed::CommandFeed;
pub use self::provider::{HostProvider, Output};

/// Install a stderr subscriber filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    if let Err(err) = Registry::default().with(filter).with(layer).try_init() {
        eprintln!("tracing already initialized: {err}");
    }
}

/// Replay `input` through a fresh tracker, writing events and replies to
/// `output` until the input ends.
///
/// # Errors
///
/// Returns an error when a reply cannot be written.
pub async fn replay<R, W>(
    input: R, output: Output<W>, config: TrackerConfig, quota: SubscriptionQuota,
) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + Sync,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let tracker = Tracker::new(config, quota, HostProvider::new(output.clone()));
    let mut feed = CommandFeed::new(input, tracker.clone(), output.clone());

    if let Err(err) = tracker.run(&mut feed, future::pending()).await {
        error!(code = err.code(), error = %err, "automatic tracking ended");
        output.write(&Reply::from(err)).await?;

        // manual control stays available once the feed is gone
        while let Some(item) = feed.next().await {
            if let FeedItem::Sample(sample) = item {
                debug!(timestamp = %sample.timestamp, "sample ignored, automatic tracking stopped");
            }
        }
    }

    Ok(())
}

/// Format an active trip's elapsed time as `m:ss`.
#[must_use]
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}
