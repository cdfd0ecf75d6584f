//! Menu-driven session over a single orchestrator.

use anyhow::{Context, Result};
use inquire::{CustomType, InquireError, Select, Text};
use std::fmt;

use weatherdash_core::{Config, LookupOutcome, LookupRequest, Orchestrator, location};

use crate::render;

pub const POPULAR_CITIES: [&str; 15] = [
    "London",
    "New York",
    "Tokyo",
    "Paris",
    "Sydney",
    "Mumbai",
    "Dubai",
    "Singapore",
    "Berlin",
    "Rome",
    "Barcelona",
    "Amsterdam",
    "Vienna",
    "Prague",
    "Budapest",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Search,
    Popular,
    Recent,
    CurrentLocation,
    ToggleUnits,
    AddAlert,
    RemoveAlert,
    Quit,
}

impl Action {
    const ALL: [Action; 8] = [
        Action::Search,
        Action::Popular,
        Action::Recent,
        Action::CurrentLocation,
        Action::ToggleUnits,
        Action::AddAlert,
        Action::RemoveAlert,
        Action::Quit,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Search => "Search for a city",
            Action::Popular => "Popular cities",
            Action::Recent => "Recent searches",
            Action::CurrentLocation => "Use my location",
            Action::ToggleUnits => "Toggle °C / °F",
            Action::AddAlert => "Add custom alert",
            Action::RemoveAlert => "Remove custom alert",
            Action::Quit => "Quit",
        };
        f.write_str(label)
    }
}

/// Prompt errors that mean "back to the menu" rather than failure.
fn cancelled(err: &InquireError) -> bool {
    matches!(err, InquireError::OperationCanceled)
}

fn interrupted(err: &InquireError) -> bool {
    matches!(err, InquireError::OperationInterrupted)
}

pub async fn run(orchestrator: &Orchestrator, config: &mut Config) -> Result<()> {
    println!("weatherdash ({} units). Press Esc to go back, Ctrl+C to quit.", orchestrator.units());

    loop {
        let action = match Select::new("What next?", Action::ALL.to_vec()).prompt() {
            Ok(action) => action,
            Err(e) if cancelled(&e) || interrupted(&e) => break,
            Err(e) => return Err(e).context("Failed to read menu choice"),
        };

        let step = match action {
            Action::Quit => break,
            Action::Search => search(orchestrator).await,
            Action::Popular => {
                let cities = POPULAR_CITIES.map(String::from).to_vec();
                pick_and_lookup(orchestrator, cities).await
            }
            Action::Recent => {
                let recent = orchestrator.preferences().history().entries().to_vec();
                if recent.is_empty() {
                    println!("No recent searches.");
                    Ok(())
                } else {
                    pick_and_lookup(orchestrator, recent).await
                }
            }
            Action::CurrentLocation => {
                let positions = location::position_source(None, config.home);
                let outcome = orchestrator.lookup_current_location(positions.as_ref()).await;
                show(orchestrator, &outcome);
                Ok(())
            }
            Action::ToggleUnits => toggle_units(orchestrator, config).await,
            Action::AddAlert => add_alert(orchestrator),
            Action::RemoveAlert => remove_alert(orchestrator),
        };

        match step {
            Ok(()) => {}
            Err(e) => match e.downcast_ref::<InquireError>() {
                Some(ie) if cancelled(ie) => continue,
                Some(ie) if interrupted(ie) => break,
                _ => return Err(e),
            },
        }
    }

    Ok(())
}

async fn search(orchestrator: &Orchestrator) -> Result<()> {
    let city = Text::new("City:").prompt()?;
    let city = city.trim();
    if city.is_empty() {
        println!("Please enter a city name.");
        return Ok(());
    }

    let outcome = orchestrator.lookup(LookupRequest::city(city)).await;
    show(orchestrator, &outcome);
    Ok(())
}

async fn pick_and_lookup(orchestrator: &Orchestrator, cities: Vec<String>) -> Result<()> {
    let city = Select::new("City:", cities).prompt()?;

    let outcome = orchestrator.lookup(LookupRequest::city(city)).await;
    show(orchestrator, &outcome);
    Ok(())
}

async fn toggle_units(orchestrator: &Orchestrator, config: &mut Config) -> Result<()> {
    let outcome = orchestrator.toggle_units().await;
    let units = orchestrator.units();
    println!("Units: {units}");

    config.units = units;
    if let Err(e) = config.save() {
        tracing::warn!("Could not persist unit preference: {e:#}");
    }

    if let Some(outcome) = outcome {
        show(orchestrator, &outcome);
    }
    Ok(())
}

fn add_alert(orchestrator: &Orchestrator) -> Result<()> {
    let temperature: f64 = CustomType::new("Temperature threshold (°C):")
        .with_error_message("Please enter a number")
        .prompt()?;
    let condition = Text::new("Condition keyword (e.g. rain, snow, clear):").prompt()?;

    if condition.trim().is_empty() {
        println!("Please enter a condition keyword.");
        return Ok(());
    }

    let rule = orchestrator.preferences().add_custom_alert(temperature, &condition);
    println!("Added alert #{}: {}", rule.id, render::describe_rule(&rule));
    Ok(())
}

fn remove_alert(orchestrator: &Orchestrator) -> Result<()> {
    let rules = orchestrator.preferences().custom_alerts().to_vec();
    if rules.is_empty() {
        println!("No custom alerts.");
        return Ok(());
    }

    let labels: Vec<String> =
        rules.iter().map(|rule| format!("#{}  {}", rule.id, render::describe_rule(rule))).collect();
    let picked = Select::new("Remove which alert?", labels).raw_prompt()?;

    let id = rules[picked.index].id;
    if orchestrator.preferences().remove_custom_alert(id) {
        println!("Removed alert #{id}");
    }
    Ok(())
}

/// Superseded lookups render nothing; the newer one owns the view.
fn show(orchestrator: &Orchestrator, outcome: &LookupOutcome) {
    if matches!(outcome, LookupOutcome::Superseded) {
        return;
    }

    let rules = orchestrator.preferences().custom_alerts().to_vec();
    render::view(&orchestrator.view(), &rules);
}
