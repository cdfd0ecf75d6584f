//! Pure display helpers: icons, AQI categories, compass labels, moon phase
//! and time formatting.

use chrono::{DateTime, Datelike, FixedOffset, Offset, Utc};

use crate::model::Coordinates;

const ICONS: &[(&str, &str)] = &[
    ("01", "☀️"),
    ("02", "⛅"),
    ("03", "☁️"),
    ("04", "☁️"),
    ("09", "🌧️"),
    ("10", "🌦️"),
    ("11", "⛈️"),
    ("13", "❄️"),
    ("50", "🌫️"),
];

pub const FALLBACK_ICON: &str = "🌤️";

/// Glyph for an upstream icon code such as `"10d"`. Only the two-character
/// prefix is significant.
pub fn weather_icon(code: &str) -> &'static str {
    let prefix = code.get(..2).unwrap_or(code);
    ICONS
        .iter()
        .find(|(key, _)| *key == prefix)
        .map(|(_, icon)| *icon)
        .unwrap_or(FALLBACK_ICON)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AqiCategory {
    pub label: &'static str,
    pub color: &'static str,
    pub health: &'static str,
}

const AQI_CATEGORIES: [AqiCategory; 5] = [
    AqiCategory {
        label: "Good",
        color: "#00E400",
        health: "Air quality is considered satisfactory, and air pollution poses little or no risk.",
    },
    AqiCategory {
        label: "Fair",
        color: "#FFFF00",
        health: "Air quality is acceptable; however, some pollutants may be a concern for a small number of people.",
    },
    AqiCategory {
        label: "Moderate",
        color: "#FF7E00",
        health: "Members of sensitive groups may experience health effects. The general public is not likely to be affected.",
    },
    AqiCategory {
        label: "Poor",
        color: "#FF0000",
        health: "Everyone may begin to experience health effects; members of sensitive groups may experience more serious effects.",
    },
    AqiCategory {
        label: "Very Poor",
        color: "#8F3F97",
        health: "Health warnings of emergency conditions. The entire population is more likely to be affected.",
    },
];

pub const UNKNOWN_AQI: AqiCategory = AqiCategory {
    label: "Unknown",
    color: "#999",
    health: "No health information available.",
};

/// Category for an AQI index in `1..=5`; anything else is [`UNKNOWN_AQI`].
pub fn aqi_category(aqi: i64) -> AqiCategory {
    match aqi {
        1..=5 => AQI_CATEGORIES[(aqi - 1) as usize],
        _ => UNKNOWN_AQI,
    }
}

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass label for a bearing in degrees.
pub fn wind_direction(degrees: f64) -> &'static str {
    let normalized = degrees.rem_euclid(360.0);
    let index = ((normalized / 22.5).round() as usize) % COMPASS.len();
    COMPASS[index]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoonPhase {
    pub name: &'static str,
    pub icon: &'static str,
}

const SYNODIC_MONTH_DAYS: f64 = 29.5306;

const MOON_PHASES: [(f64, MoonPhase); 8] = [
    (3.69, MoonPhase { name: "New Moon", icon: "🌑" }),
    (7.38, MoonPhase { name: "Waxing Crescent", icon: "🌒" }),
    (11.07, MoonPhase { name: "First Quarter", icon: "🌓" }),
    (14.76, MoonPhase { name: "Waxing Gibbous", icon: "🌔" }),
    (18.45, MoonPhase { name: "Full Moon", icon: "🌕" }),
    (22.14, MoonPhase { name: "Waning Gibbous", icon: "🌖" }),
    (25.83, MoonPhase { name: "Last Quarter", icon: "🌗" }),
    (29.52, MoonPhase { name: "Waning Crescent", icon: "🌘" }),
];

/// Approximate moon phase for the UTC calendar date of `timestamp`.
///
/// This is a rough synodic-month estimate derived from year, month and day
/// only. It is not tied to an ephemeris and can be off by a phase or more.
pub fn moon_phase(timestamp: i64) -> MoonPhase {
    let date = DateTime::from_timestamp(timestamp, 0).unwrap_or_default();
    let (year, month, day) = (date.year() as f64, date.month() as f64, date.day() as f64);

    let phase = ((year * 12.368 + month) * SYNODIC_MONTH_DAYS + day).rem_euclid(SYNODIC_MONTH_DAYS);

    MOON_PHASES
        .iter()
        .find(|(limit, _)| phase < *limit)
        .map(|(_, moon)| *moon)
        .unwrap_or(MOON_PHASES[0].1)
}

fn local_time(timestamp: i64, offset_secs: i32) -> Option<DateTime<FixedOffset>> {
    let utc: DateTime<Utc> = DateTime::from_timestamp(timestamp, 0)?;
    let offset = FixedOffset::east_opt(offset_secs).unwrap_or_else(|| Utc.fix());
    Some(utc.with_timezone(&offset))
}

fn format_with(timestamp: i64, offset_secs: i32, pattern: &str) -> String {
    local_time(timestamp, offset_secs)
        .map(|t| t.format(pattern).to_string())
        .unwrap_or_else(|| "--".to_string())
}

/// Clock time, e.g. `"06:42 AM"`.
pub fn format_time(timestamp: i64, offset_secs: i32) -> String {
    format_with(timestamp, offset_secs, "%I:%M %p")
}

/// Short date, e.g. `"Tue, Nov 14"`.
pub fn format_date(timestamp: i64, offset_secs: i32) -> String {
    format_with(timestamp, offset_secs, "%a, %b %-d")
}

/// Hour only, e.g. `"10 PM"`.
pub fn format_hour(timestamp: i64, offset_secs: i32) -> String {
    format_with(timestamp, offset_secs, "%I %p")
}

/// Rough dew point from temperature and relative humidity.
pub fn dew_point(temperature: f64, humidity_pct: u8) -> f64 {
    temperature - (100.0 - f64::from(humidity_pct)) / 5.0
}

pub fn visibility_km(visibility_m: f64) -> String {
    format!("{:.1} km", visibility_m / 1000.0)
}

pub fn precipitation_percent(probability: f64) -> u8 {
    (probability.clamp(0.0, 1.0) * 100.0).round() as u8
}

pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn map_url(coords: Coordinates) -> String {
    format!(
        "https://openweathermap.org/weathermap?basemap=map&cities=true&layer=temperature&lat={}&lon={}&zoom=10",
        coords.lat, coords.lon
    )
}
