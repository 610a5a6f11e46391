use crate::geokey::GeoId;
use thiserror::Error;

/// Errors from the data layer.
///
/// A region that exists in geometry but has no score or census entry is not
/// an error at all; that is modeled as `None` in the view models and renders
/// as "N/A".
#[derive(Debug, Error)]
pub enum DataError {
    /// Malformed identifier in source data or a request. Source-side
    /// occurrences are logged and the entry dropped; they never reach users.
    #[error("invalid geographic key: {0:?}")]
    InvalidKey(String),

    /// A remote endpoint failed or timed out. Recoverable: the same
    /// selection can be retried, and nothing is cached for the failed scope.
    #[error("failed to load {dataset}: {message}")]
    FetchFailure {
        dataset: &'static str,
        message: String,
    },

    /// A well-formed id that is not in the geometry universe. Geometry is
    /// the authoritative set of regions.
    #[error("unknown region: {0}")]
    UnknownRegion(GeoId),
}

impl DataError {
    pub fn fetch(dataset: &'static str, err: impl std::fmt::Display) -> Self {
        DataError::FetchFailure {
            dataset,
            message: err.to_string(),
        }
    }
}

/// Errors from the navigation state machine.
#[derive(Debug, Error)]
pub enum NavError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("no {event} transition from {from}")]
    InvalidTransition {
        from: &'static str,
        event: &'static str,
    },
}
