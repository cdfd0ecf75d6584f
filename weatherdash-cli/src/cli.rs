use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use std::sync::Arc;

use weatherdash_core::{
    Config, Coordinates, FileStore, LookupOutcome, LookupRequest, OpenWeatherClient, Orchestrator,
    Preferences, UnitSystem, location,
};

use crate::{interactive, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherdash", version, about = "Weather dashboard in your terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key and default units.
    Configure,

    /// Show weather for a city.
    Show {
        /// City name, e.g. "London" or "Paris,FR".
        city: String,
    },

    /// Show weather for the current position.
    Here {
        /// Latitude; defaults to the configured home position.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude; defaults to the configured home position.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// List recent searches.
    History,

    /// Manage custom temperature/condition alerts.
    Alerts {
        #[command(subcommand)]
        action: AlertsAction,
    },

    /// Set the default unit system.
    Units {
        #[arg(value_parser = parse_units)]
        system: UnitSystem,
    },

    /// Start an interactive session.
    Interactive,
}

#[derive(Debug, Subcommand)]
pub enum AlertsAction {
    /// List custom alerts.
    List,

    /// Add a custom alert.
    Add {
        /// Threshold in °C.
        #[arg(long, allow_negative_numbers = true)]
        temperature: f64,

        /// Condition keyword, e.g. "rain".
        #[arg(long)]
        condition: String,
    },

    /// Remove a custom alert by id.
    Remove { id: i64 },
}

fn parse_units(value: &str) -> Result<UnitSystem, String> {
    UnitSystem::try_from(value).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load()?;

        match self.command {
            Command::Configure => configure(&mut config)?,

            Command::Show { city } => {
                let orchestrator = open_orchestrator(&config)?;
                let outcome = orchestrator.lookup(LookupRequest::city(city)).await;
                finish_lookup(&orchestrator, outcome)?;
            }

            Command::Here { lat, lon } => {
                let explicit = lat.zip(lon).map(|(lat, lon)| Coordinates::new(lat, lon));
                let positions = location::position_source(explicit, config.home);

                let orchestrator = open_orchestrator(&config)?;
                let outcome = orchestrator.lookup_current_location(positions.as_ref()).await;
                finish_lookup(&orchestrator, outcome)?;
            }

            Command::History => {
                let preferences = open_preferences();
                render::history(preferences.history().entries());
            }

            Command::Alerts { action } => {
                let mut preferences = open_preferences();
                match action {
                    AlertsAction::List => render::custom_alerts(preferences.custom_alerts()),
                    AlertsAction::Add { temperature, condition } => {
                        if condition.trim().is_empty() {
                            bail!("Condition keyword must not be empty");
                        }
                        let rule = preferences.add_custom_alert(temperature, &condition);
                        println!("Added alert #{}: {}", rule.id, render::describe_rule(&rule));
                    }
                    AlertsAction::Remove { id } => {
                        if !preferences.remove_custom_alert(id) {
                            bail!("No custom alert with id {id}");
                        }
                        println!("Removed alert #{id}");
                    }
                }
            }

            Command::Units { system } => {
                config.units = system;
                config.save()?;
                println!("Default units set to {system}");
            }

            Command::Interactive => {
                let orchestrator = open_orchestrator(&config)?;
                interactive::run(&orchestrator, &mut config).await?;
            }
        }

        Ok(())
    }
}

fn configure(config: &mut Config) -> Result<()> {
    println!("Configuring OpenWeather access");

    let api_key = Password::new("API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Get one at https://openweathermap.org/api")
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    config.set_api_key(api_key);

    let systems = vec![UnitSystem::Metric, UnitSystem::Imperial];
    let cursor = systems.iter().position(|s| *s == config.units).unwrap_or(0);
    config.units = Select::new("Default units:", systems)
        .with_starting_cursor(cursor)
        .prompt()
        .context("Failed to read units")?;

    let home = Text::new("Home position as \"lat,lon\" (leave empty to skip):")
        .with_default(&config.home.map(|c| format!("{},{}", c.lat, c.lon)).unwrap_or_default())
        .prompt()
        .context("Failed to read home position")?;
    config.home = parse_home(&home)?;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}

fn parse_home(input: &str) -> Result<Option<Coordinates>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let (lat, lon) = input
        .split_once(',')
        .ok_or_else(|| anyhow!("Expected \"lat,lon\", got '{input}'"))?;

    let lat: f64 = lat.trim().parse().with_context(|| format!("Invalid latitude '{lat}'"))?;
    let lon: f64 = lon.trim().parse().with_context(|| format!("Invalid longitude '{lon}'"))?;

    Ok(Some(Coordinates::new(lat, lon)))
}

/// Preferences backed by the data directory, or kept in memory for this run
/// if the platform has none.
pub fn open_preferences() -> Preferences {
    match Config::data_dir() {
        Ok(dir) => Preferences::load(Box::new(FileStore::new(dir))),
        Err(e) => {
            tracing::warn!("Preferences will not be saved: {e:#}");
            Preferences::in_memory()
        }
    }
}

fn open_orchestrator(config: &Config) -> Result<Orchestrator> {
    let client = OpenWeatherClient::from_config(config)?;

    Ok(Orchestrator::new(Arc::new(client), open_preferences(), config.units)
        .with_location_timeout(config.geolocation_timeout()))
}

/// Render a one-shot lookup and turn failures into the process error.
fn finish_lookup(orchestrator: &Orchestrator, outcome: LookupOutcome) -> Result<()> {
    match outcome {
        LookupOutcome::Success(report) => {
            render::report(&report, orchestrator.preferences().custom_alerts());
            Ok(())
        }
        LookupOutcome::Superseded => Ok(()),
        LookupOutcome::NotFound | LookupOutcome::Failed(_) => match orchestrator.view().error {
            Some(err) => Err(anyhow::Error::new(err.clone()).context(err.user_message())),
            None => bail!("Lookup failed"),
        },
    }
}
