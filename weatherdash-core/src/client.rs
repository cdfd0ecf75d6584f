use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::FetchError,
    model::{
        Alert, AirQualityReading, Coordinates, CurrentReading, ForecastEntry, Locator, Place,
        UnitSystem,
    },
};

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// The upstream calls a lookup is made of.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    /// Current conditions. Returns [`FetchError::NotFound`] for unknown places.
    async fn current(
        &self,
        locator: &Locator,
        units: UnitSystem,
    ) -> Result<CurrentReading, FetchError>;

    /// Raw 3-hour samples over the 5-day horizon, oldest first.
    async fn forecast(
        &self,
        locator: &Locator,
        units: UnitSystem,
    ) -> Result<Vec<ForecastEntry>, FetchError>;

    async fn air_quality(&self, coords: Coordinates)
    -> Result<Option<AirQualityReading>, FetchError>;

    async fn alerts(&self, coords: Coordinates) -> Result<Vec<Alert>, FetchError>;

    async fn reverse_geocode(&self, coords: Coordinates) -> Result<Option<Place>, FetchError>;
}

/// Everything fetched for one lookup, before derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub current: CurrentReading,
    pub forecast: Vec<ForecastEntry>,
    pub air_quality: Option<AirQualityReading>,
    pub alerts: Vec<Alert>,
}

/// Run the calls for one lookup.
///
/// Current conditions go first; a not-found answer there ends the lookup
/// before anything else is requested. The remaining calls then run
/// concurrently against the resolved coordinates. Alerts are best-effort.
pub async fn fetch_snapshot(
    source: &dyn WeatherSource,
    locator: &Locator,
    units: UnitSystem,
) -> Result<Snapshot, FetchError> {
    let current = source.current(locator, units).await?;

    let coords = match locator {
        Locator::Coords(coords) => *coords,
        Locator::City(_) => current.location.coords,
    };

    let (forecast, air_quality, alerts) = tokio::join!(
        source.forecast(locator, units),
        source.air_quality(coords),
        source.alerts(coords)
    );

    let forecast = forecast.map_err(FetchError::into_downstream)?;
    let air_quality = air_quality.map_err(FetchError::into_downstream)?;
    let alerts = alerts.unwrap_or_else(|e| {
        tracing::warn!("Alerts unavailable for {locator}: {e}");
        Vec::new()
    });

    Ok(Snapshot { current, forecast, air_quality, alerts })
}
