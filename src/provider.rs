use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use trip_tracker::{Geocoder, LocationSample, Provider, Publisher, TripEvent};

/// Shared JSON-lines writer for events and replies.
pub struct Output<W> {
    writer: Arc<Mutex<W>>,
}

impl<W> Clone for Output<W> {
    fn clone(&self) -> Self {
        Self { writer: Arc::clone(&self.writer) }
    }
}

impl<W: AsyncWrite + Unpin + Send> Output<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer: Arc::new(Mutex::new(writer)) }
    }

    /// Write `value` as a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the write fails.
    pub async fn write(&self, value: &(impl Serialize + Sync)) -> Result<()> {
        let mut line = serde_json::to_vec(value).context("serializing output")?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await.context("writing output")?;
        writer.flush().await.context("flushing output")
    }
}

impl Output<Vec<u8>> {
    /// Lines written so far.
    pub async fn lines(&self) -> Vec<String> {
        let writer = self.writer.lock().await;
        String::from_utf8_lossy(&writer).lines().map(ToString::to_string).collect()
    }
}

/// Provider backed by the host's output stream.
///
/// There is no geocoding service on the host: locations are labelled with
/// their coordinates.
pub struct HostProvider<W> {
    output: Output<W>,
}

impl<W> Clone for HostProvider<W> {
    fn clone(&self) -> Self {
        Self { output: self.output.clone() }
    }
}

impl<W> HostProvider<W> {
    #[must_use]
    pub const fn new(output: Output<W>) -> Self {
        Self { output }
    }
}

impl<W: AsyncWrite + Unpin + Send> Provider for HostProvider<W> {}

impl<W: AsyncWrite + Unpin + Send> Geocoder for HostProvider<W> {
    async fn reverse_geocode(&self, location: &LocationSample) -> Result<String> {
        Ok(format!("{:.5}, {:.5}", location.latitude, location.longitude))
    }
}

impl<W: AsyncWrite + Unpin + Send> Publisher for HostProvider<W> {
    async fn send(&self, event: &TripEvent) -> Result<()> {
        self.output.write(event).await
    }
}
