//! Core library for the `weatherdash` app.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The upstream weather client and the lookup orchestrator
//! - Device location resolution
//! - Persisted preferences (search history, custom alerts)
//! - Pure display helpers
//!
//! It is used by `weatherdash-cli`, but can also back other front-ends.

pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod location;
pub mod model;
pub mod orchestrator;
pub mod store;

#[cfg(test)]
mod testing;

pub use client::{OpenWeatherClient, WeatherSource};
pub use config::{Config, Endpoints};
pub use error::{FetchError, LocationError, LookupError};
pub use location::{FixedPosition, NoPositionSource, PositionSource};
pub use model::{
    Coordinates, CustomAlertRule, Location, Locator, LookupRequest, UnitSystem, WeatherReport,
};
pub use orchestrator::{LookupOutcome, Orchestrator, Phase, ViewState};
pub use store::{FileStore, MemoryStore, Preferences, SearchHistory};
