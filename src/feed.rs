use chrono::Utc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, Lines};
use tracing::{error, warn};
use trip_tracker::{Error, FeedItem, LocationFeed, Tracker};

use crate::command::{Input, Reply};
use crate::format_elapsed;
use crate::provider::{HostProvider, Output};

/// Location feed read from JSON lines.
///
/// Control commands met between samples are executed against the tracker
/// and answered before the next sample is delivered, so replies keep the
/// input's order.
pub struct CommandFeed<R, W> {
    lines: Lines<R>,
    tracker: Tracker<HostProvider<W>>,
    output: Output<W>,
}

impl<R, W> CommandFeed<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(input: R, tracker: Tracker<HostProvider<W>>, output: Output<W>) -> Self {
        Self { lines: input.lines(), tracker, output }
    }

    async fn reply(&self, reply: Reply) {
        if let Err(err) = self.output.write(&reply).await {
            error!(monotonic_counter.processing_errors = 1, error = %err, "failed to write reply");
        }
    }

    async fn execute(&self, command: Input) -> Reply {
        let tracker = &self.tracker;

        let result = match command {
            Input::StartManual { location } => {
                tracker.start_manual_trip(location).await.map(|id| Reply::TripStarted { id })
            }
            Input::StopManual { id, location } => {
                tracker.stop_manual_trip(id, location).await.map(Reply::trip)
            }
            Input::Recategorize { id, category } => {
                tracker.recategorize(id, category).await.map(Reply::trip)
            }
            Input::AddTrip(entry) => tracker.add_trip(entry).await.map(Reply::trip),
            Input::Trips => Ok(Reply::trips(tracker.trips().await)),
            Input::Summary { year: None, month: None } => {
                Ok(Reply::summary(tracker.summary().await))
            }
            Input::Summary { year: Some(year), month: Some(month) } => {
                Ok(Reply::summary(tracker.monthly_summary(year, month).await))
            }
            Input::Summary { .. } => {
                Err(Error::InvalidInput("summary needs both year and month".to_string()))
            }
            Input::Status { at } => {
                let active = tracker.active_trip().await;
                let limit = tracker.config().free_auto_trip_limit;
                let at = at.unwrap_or_else(Utc::now);
                Ok(Reply::Status {
                    state: tracker.movement_state().await,
                    active_trip: active.as_ref().map(|trip| trip.id),
                    elapsed: active.map(|trip| format_elapsed(at - trip.start_time)),
                    quota_remaining: tracker.quota().await.remaining(limit),
                })
            }
            Input::SetPlan { plan } => {
                tracker.set_plan(plan).await;
                Ok(Reply::Ok)
            }
            Input::ResetPeriod => {
                tracker.reset_period().await;
                Ok(Reply::Ok)
            }
            Input::Sample(_) | Input::Unavailable { .. } => {
                Err(Error::InvalidInput("feed items are not commands".to_string()))
            }
        };

        result.unwrap_or_else(Reply::from)
    }
}

impl<R, W> LocationFeed for CommandFeed<R, W>
where
    R: AsyncBufRead + Unpin + Send + Sync,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn next(&mut self) -> Option<FeedItem> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(err) => {
                    error!(monotonic_counter.feed_errors = 1, error = %err, "failed to read input");
                    return None;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let input = match serde_json::from_str::<Input>(&line) {
                Ok(input) => input,
                Err(err) => {
                    warn!(error = %err, "ignoring malformed input line");
                    self.reply(Error::InvalidInput(err.to_string()).into()).await;
                    continue;
                }
            };

            match input.into_feed_item() {
                Ok(item) => return Some(item),
                Err(command) => {
                    let reply = self.execute(command).await;
                    self.reply(reply).await;
                }
            }
        }
    }
}
