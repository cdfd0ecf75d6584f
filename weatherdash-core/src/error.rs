//! Error taxonomy for lookups and device location.

use thiserror::Error;

/// Failure of a single upstream call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream reported the location as not found")]
    NotFound,

    #[error("upstream request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse {what} response: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// A not-found answer from any call after the first one is an ordinary
    /// upstream failure, not an unknown location.
    pub(crate) fn into_downstream(self) -> Self {
        match self {
            FetchError::NotFound => {
                FetchError::Status { status: 404, body: "not found".to_string() }
            }
            other => other,
        }
    }
}

/// Device position could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("geolocation is not supported")]
    Unsupported,

    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    Unavailable,

    #[error("location request timed out")]
    Timeout,
}

impl LocationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::Unsupported => "Geolocation is not supported on this device.",
            LocationError::PermissionDenied => {
                "Location access denied. Please enable location services."
            }
            LocationError::Unavailable => "Location information unavailable.",
            LocationError::Timeout => "Location request timed out.",
        }
    }
}

/// Outcome classification of a failed lookup, as shown to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    #[error("city not found: {query}")]
    NotFound { query: String },

    #[error("lookup failed: {message}")]
    Failed { message: String },

    #[error(transparent)]
    Location(#[from] LocationError),
}

impl LookupError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LookupError::NotFound { .. } => "City not found. Please enter a valid city name.",
            LookupError::Failed { .. } => "An error occurred. Please try again.",
            LookupError::Location(e) => e.user_message(),
        }
    }

    pub(crate) fn from_fetch(query: &str, err: FetchError) -> Self {
        match err {
            FetchError::NotFound => LookupError::NotFound { query: query.to_string() },
            other => LookupError::Failed { message: other.to_string() },
        }
    }
}
