//! # Trip Tracker Errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain error codes for trip tracking.
///
/// Degenerate geometry, quota exhaustion, short automatic trips and reverse
/// geocoding failures are handled in place and never surface here.
#[derive(Error, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    #[error("code: invalid_state, description: {0}")]
    InvalidState(String),

    #[error("code: not_found, description: {0}")]
    NotFound(String),

    #[error("code: invalid_input, description: {0}")]
    InvalidInput(String),

    #[error("code: feed_unavailable, description: {0}")]
    FeedUnavailable(String),

    #[error("code: server_error, description: {0}")]
    ServerError(String),
}

impl Error {
    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::InvalidState(_) => "invalid_state",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::FeedUnavailable(_) => "feed_unavailable",
            Self::ServerError(_) => "server_error",
        }
    }

    /// Returns the error description.
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<Self>() {
            Some(Self::InvalidState(e)) => Self::InvalidState(format!("{err}: {e}")),
            Some(Self::NotFound(e)) => Self::NotFound(format!("{err}: {e}")),
            Some(Self::InvalidInput(e)) => Self::InvalidInput(format!("{err}: {e}")),
            Some(Self::FeedUnavailable(e)) => Self::FeedUnavailable(format!("{err}: {e}")),
            Some(Self::ServerError(e)) => Self::ServerError(format!("{err}: {e}")),
            None => {
                let stack = err.chain().fold(String::new(), |cause, e| format!("{cause} -> {e}"));
                let stack = stack.trim_start_matches(" -> ").to_string();
                Self::ServerError(stack)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Context, anyhow};

    use super::*;

    // Should keep the domain variant when context is added.
    #[test]
    fn domain_context() {
        let result = Err::<(), Error>(Error::InvalidState("no active trip".to_string()))
            .context("stopping manual trip");
        let err: Error = result.unwrap_err().into();

        assert_eq!(err.code(), "invalid_state");
        assert_eq!(
            err.to_string(),
            "code: invalid_state, description: stopping manual trip: no active trip"
        );
    }

    // Should fold a foreign error chain into a server error.
    #[test]
    fn anyhow_context() {
        let result = Err::<(), anyhow::Error>(anyhow!("socket closed")).context("publishing event");
        let err: Error = result.unwrap_err().into();

        assert_eq!(
            err.to_string(),
            "code: server_error, description: publishing event -> socket closed"
        );
    }

    #[test]
    fn codes() {
        assert_eq!(Error::NotFound("trip".to_string()).code(), "not_found");
        assert_eq!(Error::InvalidInput("distance".to_string()).code(), "invalid_input");
        assert_eq!(Error::FeedUnavailable("denied".to_string()).code(), "feed_unavailable");
    }
}
