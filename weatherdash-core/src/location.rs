//! Device position and reverse geocoding.

use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};

use crate::{
    client::WeatherSource,
    error::LocationError,
    model::{Coordinates, LookupRequest},
};

/// Something that can report where the device is.
#[async_trait]
pub trait PositionSource: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// A position known up front (command-line flags or the configured home).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        let Coordinates { lat, lon } = self.0;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(LocationError::Unavailable);
        }
        Ok(self.0)
    }
}

/// No positioning capability at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPositionSource;

#[async_trait]
impl PositionSource for NoPositionSource {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::Unsupported)
    }
}

/// Pick a position source: explicit coordinates win over the configured home.
pub fn position_source(
    explicit: Option<Coordinates>,
    home: Option<Coordinates>,
) -> Box<dyn PositionSource> {
    match explicit.or(home) {
        Some(coords) => Box::new(FixedPosition(coords)),
        None => Box::new(NoPositionSource),
    }
}

/// Ask for the device position and label it with the nearest place name.
///
/// The returned request always addresses the upstream API by coordinates. A
/// reverse-geocoding failure only loses the label.
pub async fn resolve_location(
    positions: &dyn PositionSource,
    geocoder: &dyn WeatherSource,
    timeout: Duration,
) -> Result<LookupRequest, LocationError> {
    let coords = tokio::time::timeout(timeout, positions.current_position())
        .await
        .map_err(|_| LocationError::Timeout)??;

    tracing::debug!("Device position: {coords}");

    let label = match geocoder.reverse_geocode(coords).await {
        Ok(Some(place)) => {
            tracing::info!("Reverse geocoded {coords} to {}, {}", place.name, place.country);
            Some(place.name)
        }
        Ok(None) => {
            tracing::warn!("No place found near {coords}");
            None
        }
        Err(e) => {
            tracing::warn!("Reverse geocoding failed for {coords}: {e}");
            None
        }
    };

    Ok(LookupRequest::coords(coords, label))
}
