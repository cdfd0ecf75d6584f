//! Human-readable output for reports, history and alerts.

use chrono::Local;
use weatherdash_core::{
    CustomAlertRule, ViewState, WeatherReport,
    format::{
        aqi_category, capitalize, dew_point, format_date, format_hour, format_time, map_url,
        moon_phase, precipitation_percent, visibility_km, weather_icon, wind_direction,
    },
    model::{Alert, AirQualitySample},
    orchestrator::Phase,
};

pub fn report(report: &WeatherReport, rules: &[CustomAlertRule]) {
    let current = &report.current;
    let units = report.units;
    let temp = units.temperature_symbol();
    let tz = current.timezone_offset;

    println!();
    println!(
        "{} {}  ({})",
        weather_icon(&current.condition.icon),
        report.location.display_name(),
        format_date(current.observed_at, tz)
    );
    println!(
        "   {:.0}{temp}  {}  (feels like {:.0}{temp})",
        current.temperature,
        capitalize(&current.condition.description),
        current.feels_like
    );
    println!();
    println!("   Humidity     {}%", current.humidity_pct);
    println!("   Dew point    {:.0}{temp}", dew_point(current.temperature, current.humidity_pct));
    println!("   Pressure     {:.0} hPa", current.pressure_hpa);
    println!(
        "   Wind         {:.1} {} {}",
        current.wind_speed,
        units.speed_symbol(),
        wind_direction(current.wind_deg)
    );
    match current.visibility_m {
        Some(v) => println!("   Visibility   {}", visibility_km(v)),
        None => println!("   Visibility   --"),
    }
    println!("   Clouds       {}%", current.cloud_cover_pct);

    let moon = moon_phase(current.observed_at);
    println!();
    println!(
        "   Sunrise {}   Sunset {}   {} {}",
        format_time(current.sunrise, tz),
        format_time(current.sunset, tz),
        moon.icon,
        moon.name
    );

    if !report.hourly.is_empty() {
        println!();
        println!("Next 24 hours");
        for entry in &report.hourly {
            println!(
                "   {:>5}  {} {:>4.0}{temp}  {:>3}%",
                format_hour(entry.timestamp, tz),
                weather_icon(&entry.condition.icon),
                entry.temperature,
                precipitation_percent(entry.precipitation_probability)
            );
        }
    }

    if !report.daily.is_empty() {
        println!();
        println!("5-day forecast");
        for entry in &report.daily {
            println!(
                "   {:<11}  {} {:>4.0}{temp}  {}",
                format_date(entry.timestamp, tz),
                weather_icon(&entry.condition.icon),
                entry.temperature,
                capitalize(&entry.condition.description)
            );
        }
    }

    if let Some(aq) = &report.air_quality {
        air_quality(aq);
    }

    weather_alerts(&report.alerts, tz);

    let triggered = report.triggered_rules(rules);
    if !triggered.is_empty() {
        println!();
        println!("Your alerts");
        for rule in triggered {
            println!("   🔔 {}", describe_rule(rule));
        }
    }

    println!();
    println!("Map: {}", map_url(report.location.coords));
    println!(
        "Updated {} ({})",
        report.fetched_at.with_timezone(&Local).format("%H:%M:%S"),
        units
    );
}

fn air_quality(aq: &AirQualitySample) {
    let category = aqi_category(i64::from(aq.aqi));
    let p = &aq.pollutants;

    println!();
    println!("Air quality: {} ({})", category.label, aq.aqi);
    println!("   {}", category.health);
    println!(
        "   PM2.5 {:.1}  PM10 {:.1}  CO {:.1}  NO2 {:.1}  O3 {:.1}  SO2 {:.1}",
        p.pm2_5, p.pm10, p.co, p.no2, p.o3, p.so2
    );
}

fn weather_alerts(alerts: &[Alert], tz: i32) {
    if alerts.is_empty() {
        return;
    }

    println!();
    println!("Weather alerts");
    for alert in alerts {
        println!(
            "   ⚠️  {} ({} {} - {} {})",
            alert.event,
            format_date(alert.start, tz),
            format_time(alert.start, tz),
            format_date(alert.end, tz),
            format_time(alert.end, tz)
        );
        if let Some(sender) = &alert.sender {
            println!("      Issued by {sender}");
        }
        if !alert.description.is_empty() {
            println!("      {}", alert.description.trim());
        }
    }
}

/// Print whatever the view currently holds: the report if there is one, and
/// the error indicator if the last lookup failed.
pub fn view(view: &ViewState, rules: &[CustomAlertRule]) {
    if let Some(report) = &view.report {
        self::report(report, rules);
    }

    match (&view.phase, &view.error) {
        (Phase::NotFound | Phase::Failed, Some(err)) => {
            println!();
            println!("❌ {}", err.user_message());
        }
        (Phase::Idle, _) if view.report.is_none() => {
            println!("Search for a city to get started.");
        }
        _ => {}
    }
}

pub fn history(entries: &[String]) {
    if entries.is_empty() {
        println!("No recent searches.");
        return;
    }

    for (i, name) in entries.iter().enumerate() {
        println!("{}. {name}", i + 1);
    }
}

pub fn custom_alerts(rules: &[CustomAlertRule]) {
    if rules.is_empty() {
        println!("No custom alerts.");
        return;
    }

    for rule in rules {
        let state = if rule.active { "" } else { " (inactive)" };
        println!("#{}  {}{state}", rule.id, describe_rule(rule));
    }
}

pub fn describe_rule(rule: &CustomAlertRule) -> String {
    format!("{} when at or above {:.1}°C", capitalize(&rule.condition), rule.temperature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_description_mentions_keyword_and_threshold() {
        let rule = CustomAlertRule { id: 1, temperature: 25.0, condition: "rain".into(), active: true };
        assert_eq!(describe_rule(&rule), "Rain when at or above 25.0°C");
    }
}
