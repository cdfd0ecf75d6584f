//! Scriptable in-memory [`WeatherSource`] for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::Notify;

use crate::{
    client::WeatherSource,
    error::FetchError,
    model::{
        Alert, AirQualityReading, Coordinates, CurrentConditions, CurrentReading, ForecastEntry,
        Location, Locator, Place, Pollutants, UnitSystem, fixtures,
    },
};

pub const FORECAST_START: i64 = 1_700_000_000;
pub const FORECAST_LEN: usize = 40;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub current: usize,
    pub forecast: usize,
    pub air_quality: usize,
    pub alerts: usize,
    pub reverse_geocode: usize,
}

#[derive(Debug, Default)]
pub struct FakeSource {
    unknown: HashSet<String>,
    failing: Mutex<HashSet<String>>,
    failing_alerts: bool,
    place: Option<Place>,
    geocode_fails: bool,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Calls>,
    current_requests: Mutex<Vec<(Locator, UnitSystem)>>,
    air_quality_coords: Mutex<Vec<Coordinates>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            place: Some(Place { name: "Geotown".into(), country: "GT".into() }),
            ..Self::default()
        }
    }

    /// Current conditions for `city` answer not-found.
    pub fn unknown(mut self, city: &str) -> Self {
        self.unknown.insert(city.to_lowercase());
        self
    }

    /// Current conditions for `city` answer a server error.
    pub fn failing(self, city: &str) -> Self {
        self.start_failing(city);
        self
    }

    pub fn start_failing(&self, city: &str) {
        self.failing.lock().insert(city.to_lowercase());
    }

    pub fn failing_alerts(mut self) -> Self {
        self.failing_alerts = true;
        self
    }

    pub fn without_place(mut self) -> Self {
        self.place = None;
        self
    }

    pub fn failing_geocode(mut self) -> Self {
        self.geocode_fails = true;
        self
    }

    /// Hold current-conditions calls for `city` until [`FakeSource::release`].
    pub fn gated(self, city: &str) -> Self {
        self.gates.lock().insert(city.to_lowercase(), Arc::new(Notify::new()));
        self
    }

    pub fn release(&self, city: &str) {
        if let Some(gate) = self.gates.lock().get(&city.to_lowercase()) {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Calls {
        *self.calls.lock()
    }

    pub fn current_requests(&self) -> Vec<(Locator, UnitSystem)> {
        self.current_requests.lock().clone()
    }

    pub fn air_quality_coords(&self) -> Vec<Coordinates> {
        self.air_quality_coords.lock().clone()
    }

    pub fn coords_for(city: &str) -> Coordinates {
        let sum: u32 = city.to_lowercase().bytes().map(u32::from).sum();
        Coordinates::new(f64::from(sum % 90), f64::from(sum % 180))
    }

    fn reading_for(locator: &Locator, units: UnitSystem) -> CurrentReading {
        let location = match locator {
            Locator::City(name) => Location {
                name: name.clone(),
                country: "XX".into(),
                coords: Self::coords_for(name),
            },
            Locator::Coords(coords) => {
                Location { name: "Upstream Name".into(), country: "XX".into(), coords: *coords }
            }
        };

        let temperature = match units {
            UnitSystem::Metric => 20.0,
            UnitSystem::Imperial => 68.0,
        };
        let conditions: CurrentConditions = fixtures::current(temperature, "Clouds", "few clouds");

        CurrentReading { location, conditions }
    }
}

#[async_trait]
impl WeatherSource for FakeSource {
    async fn current(
        &self,
        locator: &Locator,
        units: UnitSystem,
    ) -> Result<CurrentReading, FetchError> {
        self.calls.lock().current += 1;
        self.current_requests.lock().push((locator.clone(), units));

        if let Locator::City(name) = locator {
            let key = name.to_lowercase();
            let gate = self.gates.lock().get(&key).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if self.unknown.contains(&key) {
                return Err(FetchError::NotFound);
            }
            if self.failing.lock().contains(&key) {
                return Err(FetchError::Status { status: 500, body: "boom".into() });
            }
        }

        Ok(Self::reading_for(locator, units))
    }

    async fn forecast(
        &self,
        _locator: &Locator,
        units: UnitSystem,
    ) -> Result<Vec<ForecastEntry>, FetchError> {
        self.calls.lock().forecast += 1;

        let offset = match units {
            UnitSystem::Metric => 0.0,
            UnitSystem::Imperial => 100.0,
        };
        Ok((0..FORECAST_LEN)
            .map(|i| ForecastEntry {
                timestamp: FORECAST_START + (i as i64) * 3 * 3600,
                temperature: offset + i as f64,
                condition: fixtures::condition("Rain", "light rain", "10d"),
                precipitation_probability: 0.25,
            })
            .collect())
    }

    async fn air_quality(
        &self,
        coords: Coordinates,
    ) -> Result<Option<AirQualityReading>, FetchError> {
        self.calls.lock().air_quality += 1;
        self.air_quality_coords.lock().push(coords);

        Ok(Some(AirQualityReading {
            aqi: 2,
            pollutants: Pollutants { pm2_5: 5.0, pm10: 9.0, co: 200.0, no2: 7.0, o3: 60.0, so2: 1.0 },
        }))
    }

    async fn alerts(&self, _coords: Coordinates) -> Result<Vec<Alert>, FetchError> {
        self.calls.lock().alerts += 1;

        if self.failing_alerts {
            return Err(FetchError::Status { status: 401, body: "onecall not allowed".into() });
        }
        Ok(vec![Alert {
            event: "Wind advisory".into(),
            description: "Gusts up to 60 km/h".into(),
            start: FORECAST_START,
            end: FORECAST_START + 3600,
            sender: None,
        }])
    }

    async fn reverse_geocode(&self, _coords: Coordinates) -> Result<Option<Place>, FetchError> {
        self.calls.lock().reverse_geocode += 1;

        if self.geocode_fails {
            return Err(FetchError::Status { status: 503, body: "unavailable".into() });
        }
        Ok(self.place.clone())
    }
}
