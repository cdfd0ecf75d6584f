use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    config::{Config, Endpoints},
    error::FetchError,
    model::{
        Alert, AirQualityReading, Condition, Coordinates, CurrentConditions, CurrentReading,
        ForecastEntry, Location, Locator, Place, Pollutants, UnitSystem,
    },
};

use super::WeatherSource;

/// OpenWeather client. The API key travels as the `appid` query parameter.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    endpoints: Endpoints,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoints(api_key, Endpoints::default())
    }

    pub fn with_endpoints(api_key: String, endpoints: Endpoints) -> Self {
        Self { api_key, endpoints, http: Client::new() }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api_key().context("Cannot query OpenWeather")?;
        Ok(Self::with_endpoints(api_key.to_owned(), config.endpoints.clone()))
    }

    fn data_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.endpoints.base.trim_end_matches('/'))
    }

    fn geo_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.endpoints.geo.trim_end_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        mut params: Vec<(&'static str, String)>,
        what: &'static str,
    ) -> Result<T, FetchError> {
        params.push(("appid", self.api_key.clone()));
        tracing::debug!("GET {url} ({what})");

        let res = self.http.get(&url).query(&params).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }

        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16(), body: truncate_body(&body) });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Decode { what, source })
    }
}

fn locator_params(locator: &Locator, units: UnitSystem) -> Vec<(&'static str, String)> {
    let mut params = match locator {
        Locator::City(name) => vec![("q", name.clone())],
        Locator::Coords(coords) => coords_params(*coords),
    };
    params.push(("units", units.as_str().to_string()));
    params
}

fn coords_params(coords: Coordinates) -> Vec<(&'static str, String)> {
    vec![("lat", coords.lat.to_string()), ("lon", coords.lon.to_string())]
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: u32,
    main: String,
    description: String,
    icon: String,
}

impl From<&OwWeather> for Condition {
    fn from(w: &OwWeather) -> Self {
        Condition {
            id: w.id,
            main: w.main.clone(),
            description: w.description.clone(),
            icon: w.icon.clone(),
        }
    }
}

fn first_condition(weather: &[OwWeather]) -> Condition {
    weather.first().map(Condition::from).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    #[serde(default)]
    pressure: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Deserialize)]
struct OwClouds {
    all: u8,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
    #[serde(default)]
    sunrise: i64,
    #[serde(default)]
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    coord: OwCoord,
    weather: Vec<OwWeather>,
    main: OwMain,
    visibility: Option<f64>,
    wind: OwWind,
    clouds: Option<OwClouds>,
    dt: i64,
    #[serde(default)]
    sys: OwSys,
    #[serde(default)]
    timezone: i32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwAqi {
    aqi: u8,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwComponents {
    co: f64,
    no2: f64,
    o3: f64,
    so2: f64,
    pm2_5: f64,
    pm10: f64,
}

#[derive(Debug, Deserialize)]
struct OwAirEntry {
    main: OwAqi,
    #[serde(default)]
    components: OwComponents,
}

#[derive(Debug, Deserialize)]
struct OwAirResponse {
    list: Vec<OwAirEntry>,
}

#[derive(Debug, Deserialize)]
struct OwAlert {
    event: String,
    #[serde(default)]
    description: String,
    start: i64,
    end: i64,
    sender_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwAlertsResponse {
    #[serde(default)]
    alerts: Vec<OwAlert>,
}

#[derive(Debug, Deserialize)]
struct OwGeoPlace {
    name: String,
    #[serde(default)]
    country: String,
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn current(
        &self,
        locator: &Locator,
        units: UnitSystem,
    ) -> Result<CurrentReading, FetchError> {
        let parsed: OwCurrentResponse = self
            .get_json(self.data_url("weather"), locator_params(locator, units), "current weather")
            .await?;

        let location = Location {
            name: parsed.name,
            country: parsed.sys.country,
            coords: Coordinates::new(parsed.coord.lat, parsed.coord.lon),
        };

        let conditions = CurrentConditions {
            temperature: parsed.main.temp,
            feels_like: parsed.main.feels_like,
            humidity_pct: parsed.main.humidity,
            pressure_hpa: parsed.main.pressure,
            wind_speed: parsed.wind.speed,
            wind_deg: parsed.wind.deg,
            visibility_m: parsed.visibility,
            cloud_cover_pct: parsed.clouds.map(|c| c.all).unwrap_or(0),
            condition: first_condition(&parsed.weather),
            sunrise: parsed.sys.sunrise,
            sunset: parsed.sys.sunset,
            observed_at: parsed.dt,
            timezone_offset: parsed.timezone,
        };

        Ok(CurrentReading { location, conditions })
    }

    async fn forecast(
        &self,
        locator: &Locator,
        units: UnitSystem,
    ) -> Result<Vec<ForecastEntry>, FetchError> {
        let parsed: OwForecastResponse = self
            .get_json(self.data_url("forecast"), locator_params(locator, units), "forecast")
            .await?;

        Ok(parsed
            .list
            .iter()
            .map(|entry| ForecastEntry {
                timestamp: entry.dt,
                temperature: entry.main.temp,
                condition: first_condition(&entry.weather),
                precipitation_probability: entry.pop,
            })
            .collect())
    }

    async fn air_quality(
        &self,
        coords: Coordinates,
    ) -> Result<Option<AirQualityReading>, FetchError> {
        let parsed: OwAirResponse = self
            .get_json(self.data_url("air_pollution"), coords_params(coords), "air quality")
            .await?;

        Ok(parsed.list.into_iter().next().map(|entry| AirQualityReading {
            aqi: entry.main.aqi,
            pollutants: Pollutants {
                pm2_5: entry.components.pm2_5,
                pm10: entry.components.pm10,
                co: entry.components.co,
                no2: entry.components.no2,
                o3: entry.components.o3,
                so2: entry.components.so2,
            },
        }))
    }

    async fn alerts(&self, coords: Coordinates) -> Result<Vec<Alert>, FetchError> {
        let mut params = coords_params(coords);
        params.push(("exclude", "current,minutely,hourly,daily".to_string()));

        let parsed: OwAlertsResponse =
            self.get_json(self.data_url("onecall"), params, "alerts").await?;

        Ok(parsed
            .alerts
            .into_iter()
            .map(|a| Alert {
                event: a.event,
                description: a.description,
                start: a.start,
                end: a.end,
                sender: a.sender_name,
            })
            .collect())
    }

    async fn reverse_geocode(&self, coords: Coordinates) -> Result<Option<Place>, FetchError> {
        let mut params = coords_params(coords);
        params.push(("limit", "1".to_string()));

        let places: Vec<OwGeoPlace> =
            self.get_json(self.geo_url("reverse"), params, "reverse geocoding").await?;

        Ok(places
            .into_iter()
            .next()
            .map(|p| Place { name: p.name, country: p.country }))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
