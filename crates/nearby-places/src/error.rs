//! Errors from the remote place and map services.

use nearby_core::{AppError, NetworkError};
use thiserror::Error;

use crate::types::LocationError;

#[derive(Error, Debug)]
pub enum PlacesError {
    #[error("Missing API key for {0}")]
    MissingApiKey(&'static str),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl PlacesError {
    /// Short message for the end of a CLI run.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingApiKey(service) => format!("Add an API key for {} to the parameters.", service),
            Self::RateLimited(secs) => format!("Too many requests. Please wait {} seconds.", secs),
            Self::Http { status, .. } if *status >= 500 => {
                "The service is having issues. Please try again later.".to_string()
            }
            Self::Http { .. } => "The request was rejected. Check your API key.".to_string(),
            Self::Api(msg) => format!("Service error: {}", msg),
            Self::Parse(_) => "Received an unexpected response.".to_string(),
            Self::Location(_) => "Could not determine the current location.".to_string(),
            Self::Network(_) => "Network error. Check your connection.".to_string(),
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Network(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<PlacesError> for AppError {
    fn from(err: PlacesError) -> Self {
        match err {
            PlacesError::Network(e) if e.is_timeout() => AppError::Network(NetworkError::Timeout),
            PlacesError::Network(e) => {
                AppError::Network(NetworkError::ConnectionFailed(e.to_string()))
            }
            PlacesError::Http { status, message } => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            PlacesError::Parse(msg) => AppError::Network(NetworkError::InvalidResponse(msg)),
            other => AppError::Service(other.to_string()),
        }
    }
}
