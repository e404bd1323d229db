//! Where the snapshot is centered.
//!
//! There is no sensor access here: the location is an override from the
//! parameters, the command line, or the config defaults.

use async_trait::async_trait;

use crate::types::{Coordinates, Location, LocationError};

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Current position.
    ///
    /// # Errors
    /// Provider-specific `LocationError`.
    async fn current(&self) -> Result<Location, LocationError>;
}

/// A fixed position.
#[derive(Debug, Clone)]
pub struct StaticLocation {
    coords: Coordinates,
}

impl StaticLocation {
    pub fn new(coords: Coordinates) -> Self {
        Self { coords }
    }
}

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn current(&self) -> Result<Location, LocationError> {
        if !self.coords.is_valid() {
            return Err(LocationError::InvalidCoordinates(self.coords.to_string()));
        }
        Ok(Location::from(self.coords))
    }
}

/// Used when no override is configured.
#[derive(Debug, Clone, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current(&self) -> Result<Location, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

/// Pick a provider from an optional override.
pub fn provider_for(coords: Option<Coordinates>) -> Box<dyn LocationProvider> {
    match coords {
        Some(c) => Box::new(StaticLocation::new(c)),
        None => Box::new(NoLocation),
    }
}

/// Ask the provider for a position, trying a second time if the first request fails.
///
/// # Errors
/// The error from the second attempt.
pub async fn acquire(provider: &dyn LocationProvider) -> Result<Location, LocationError> {
    match provider.current().await {
        Ok(location) => Ok(location),
        Err(e) => {
            tracing::warn!("Could not get current location: {}. Trying again", e);
            provider.current().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls.
    struct Flaky {
        calls: AtomicUsize,
        failures: usize,
    }

    #[async_trait]
    impl LocationProvider for Flaky {
        async fn current(&self) -> Result<Location, LocationError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(LocationError::Timeout)
            } else {
                Ok(Location::from(Coordinates::new(1.0, 2.0)))
            }
        }
    }

    #[tokio::test]
    async fn test_static_location() {
        let provider = StaticLocation::new(Coordinates::new(41.68, -70.2));
        let location = acquire(&provider).await.unwrap();
        assert_eq!(location.coordinates(), Coordinates::new(41.68, -70.2));
        assert!(location.accuracy_meters.is_none());
    }

    #[tokio::test]
    async fn test_static_location_rejects_invalid() {
        let provider = StaticLocation::new(Coordinates::new(100.0, 0.0));
        let result = acquire(&provider).await;
        assert!(matches!(result, Err(LocationError::InvalidCoordinates(_))));
    }

    #[tokio::test]
    async fn test_no_location_is_unavailable() {
        let provider = provider_for(None);
        let result = acquire(provider.as_ref()).await;
        assert!(matches!(result, Err(LocationError::ServiceUnavailable)));
    }

    #[tokio::test]
    async fn test_acquire_retries_once() {
        let provider = Flaky {
            calls: AtomicUsize::new(0),
            failures: 1,
        };
        assert!(acquire(&provider).await.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        let provider = Flaky {
            calls: AtomicUsize::new(0),
            failures: 2,
        };
        assert!(matches!(acquire(&provider).await, Err(LocationError::Timeout)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
