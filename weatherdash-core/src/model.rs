use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

/// Measurement system requested from the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Value of the `units` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "°C",
            UnitSystem::Imperial => "°F",
        }
    }

    pub fn speed_symbol(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "m/s",
            UnitSystem::Imperial => "mph",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            UnitSystem::Metric => UnitSystem::Imperial,
            UnitSystem::Imperial => UnitSystem::Metric,
        }
    }

    /// Express a temperature reported in this system in degrees Celsius.
    pub fn to_celsius(&self, value: f64) -> f64 {
        match self {
            UnitSystem::Metric => value,
            UnitSystem::Imperial => (value - 32.0) * 5.0 / 9.0,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UnitSystem {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" | "c" | "celsius" => Ok(UnitSystem::Metric),
            "imperial" | "f" | "fahrenheit" => Ok(UnitSystem::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: metric, imperial."
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// A resolved place. Replaced wholesale on every lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub country: String,
    pub coords: Coordinates,
}

impl Location {
    pub fn display_name(&self) -> String {
        if self.country.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.country)
        }
    }
}

/// Nearest named place for a coordinate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub country: String,
}

/// How a lookup addresses the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Locator {
    City(String),
    Coords(Coordinates),
}

impl Locator {
    /// Whether two locators address the same place. City names compare
    /// case-insensitively.
    pub fn same_place(&self, other: &Locator) -> bool {
        match (self, other) {
            (Locator::City(a), Locator::City(b)) => {
                a.trim().to_lowercase() == b.trim().to_lowercase()
            }
            (Locator::Coords(a), Locator::Coords(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::City(name) => f.write_str(name),
            Locator::Coords(coords) => write!(f, "({coords})"),
        }
    }
}

/// One lookup request: where to look, plus an optional display label that
/// overrides the upstream place name (set by reverse geocoding).
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRequest {
    pub locator: Locator,
    pub label: Option<String>,
}

impl LookupRequest {
    pub fn city(name: impl Into<String>) -> Self {
        Self { locator: Locator::City(name.into().trim().to_string()), label: None }
    }

    pub fn coords(coords: Coordinates, label: Option<String>) -> Self {
        Self { locator: Locator::Coords(coords), label }
    }
}

/// Upstream weather condition (`weather[0]` in OpenWeather payloads).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

impl Default for Condition {
    fn default() -> Self {
        Self {
            id: 0,
            main: "Unknown".to_string(),
            description: "unknown".to_string(),
            icon: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: f64,
    pub wind_speed: f64,
    pub wind_deg: f64,
    pub visibility_m: Option<f64>,
    pub cloud_cover_pct: u8,
    pub condition: Condition,
    pub sunrise: i64,
    pub sunset: i64,
    pub observed_at: i64,
    /// Shift from UTC in seconds for the location.
    pub timezone_offset: i32,
}

/// Result of the current-conditions call: the resolved place and its readings.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentReading {
    pub location: Location,
    pub conditions: CurrentConditions,
}

/// A single 3-hour forecast sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub timestamp: i64,
    pub temperature: f64,
    pub condition: Condition,
    /// Probability of precipitation in `0.0..=1.0`.
    pub precipitation_probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pollutants {
    pub pm2_5: f64,
    pub pm10: f64,
    pub co: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
}

/// Air-quality reading as returned by the client, before it is tagged with a place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirQualityReading {
    pub aqi: u8,
    pub pollutants: Pollutants,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualitySample {
    pub location: Location,
    /// Category 1 (good) to 5 (very poor).
    pub aqi: u8,
    pub pollutants: Pollutants,
}

/// Upstream weather alert. Read-only and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub event: String,
    pub description: String,
    pub start: i64,
    pub end: i64,
    pub sender: Option<String>,
}

/// User-defined alert threshold, persisted across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAlertRule {
    pub id: i64,
    /// Threshold in degrees Celsius.
    pub temperature: f64,
    /// Lowercased condition keyword, e.g. "rain".
    pub condition: String,
    pub active: bool,
}

impl CustomAlertRule {
    /// A rule fires when it is active, the temperature (in °C) is at or above
    /// the threshold and the keyword appears in the condition.
    pub fn is_triggered_by(&self, current: &CurrentConditions, units: UnitSystem) -> bool {
        if !self.active {
            return false;
        }

        let celsius = units.to_celsius(current.temperature);
        let keyword = self.condition.to_lowercase();
        let matches_condition = current.condition.main.to_lowercase().contains(&keyword)
            || current.condition.description.to_lowercase().contains(&keyword);

        celsius >= self.temperature && matches_condition
    }
}

/// Consolidated view data for one successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub locator: Locator,
    pub location: Location,
    pub units: UnitSystem,
    pub current: CurrentConditions,
    pub hourly: Vec<ForecastEntry>,
    pub daily: Vec<ForecastEntry>,
    pub air_quality: Option<AirQualitySample>,
    pub alerts: Vec<Alert>,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherReport {
    pub fn triggered_rules<'a>(&self, rules: &'a [CustomAlertRule]) -> Vec<&'a CustomAlertRule> {
        rules.iter().filter(|rule| rule.is_triggered_by(&self.current, self.units)).collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn condition(main: &str, description: &str, icon: &str) -> Condition {
        Condition {
            id: 800,
            main: main.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
        }
    }

    pub fn current(temperature: f64, main: &str, description: &str) -> CurrentConditions {
        CurrentConditions {
            temperature,
            feels_like: temperature,
            humidity_pct: 60,
            pressure_hpa: 1013.0,
            wind_speed: 3.5,
            wind_deg: 200.0,
            visibility_m: Some(10_000.0),
            cloud_cover_pct: 20,
            condition: condition(main, description, "01d"),
            sunrise: 1_700_000_000,
            sunset: 1_700_036_000,
            observed_at: 1_700_010_000,
            timezone_offset: 0,
        }
    }
}
