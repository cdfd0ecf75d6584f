//! Turns lookup requests into one consistent view.
//!
//! Each lookup takes a token from a monotonically increasing counter when it
//! starts. Its result is applied only if no newer lookup has started since;
//! otherwise it is dropped as [`LookupOutcome::Superseded`]. The view is
//! replaced as a whole on success, so current conditions, forecasts, air
//! quality and alerts always describe the same place.

use chrono::Utc;
use parking_lot::{Mutex, MutexGuard};
use std::{sync::Arc, time::Duration};

use crate::{
    client::{self, Snapshot, WeatherSource},
    error::LookupError,
    location::{self, PositionSource},
    model::{AirQualitySample, ForecastEntry, Locator, LookupRequest, UnitSystem, WeatherReport},
    store::Preferences,
};

/// Samples per day in the 3-hour forecast.
pub const SAMPLES_PER_DAY: usize = 8;

/// The next 24 hours: the first day's worth of samples.
pub fn derive_hourly(raw: &[ForecastEntry]) -> Vec<ForecastEntry> {
    raw.iter().take(SAMPLES_PER_DAY).cloned().collect()
}

/// One sample per day, taken at a fixed stride from the start.
pub fn derive_daily(raw: &[ForecastEntry]) -> Vec<ForecastEntry> {
    raw.iter().step_by(SAMPLES_PER_DAY).cloned().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Success,
    NotFound,
    Failed,
}

/// What a front-end should display right now.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub phase: Phase,
    pub report: Option<WeatherReport>,
    pub error: Option<LookupError>,
    pub units: UnitSystem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Success(Box<WeatherReport>),
    NotFound,
    Failed(LookupError),
    /// A newer lookup started before this one finished; its result was dropped.
    Superseded,
}

#[derive(Debug, Default)]
struct Inner {
    view: ViewState,
    latest_token: u64,
    /// Request of the lookup currently fetching, if it is still the latest.
    in_flight: Option<LookupRequest>,
}

impl Inner {
    fn is_current(&self, token: u64) -> bool {
        self.latest_token == token
    }

    /// Drop the displayed report if it belongs to a different place than `target`.
    fn clear_if_elsewhere(&mut self, target: &Locator) {
        let elsewhere =
            self.view.report.as_ref().is_some_and(|report| !report.locator.same_place(target));
        if elsewhere {
            self.view.report = None;
        }
    }
}

#[derive(Debug)]
pub struct Orchestrator {
    source: Arc<dyn WeatherSource>,
    preferences: Mutex<Preferences>,
    inner: Mutex<Inner>,
    location_timeout: Duration,
}

impl Orchestrator {
    pub fn new(source: Arc<dyn WeatherSource>, preferences: Preferences, units: UnitSystem) -> Self {
        let inner = Inner { view: ViewState { units, ..ViewState::default() }, ..Inner::default() };

        Self {
            source,
            preferences: Mutex::new(preferences),
            inner: Mutex::new(inner),
            location_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_location_timeout(mut self, timeout: Duration) -> Self {
        self.location_timeout = timeout;
        self
    }

    pub fn view(&self) -> ViewState {
        self.inner.lock().view.clone()
    }

    pub fn units(&self) -> UnitSystem {
        self.inner.lock().view.units
    }

    pub fn preferences(&self) -> MutexGuard<'_, Preferences> {
        self.preferences.lock()
    }

    /// Look up weather for `request`. The latest started lookup wins.
    pub async fn lookup(&self, request: LookupRequest) -> LookupOutcome {
        let token = self.begin(Some(&request.locator));
        self.run(token, request).await
    }

    /// Resolve the device position, then look it up by coordinates.
    pub async fn lookup_current_location(&self, positions: &dyn PositionSource) -> LookupOutcome {
        let token = self.begin(None);

        let resolved =
            location::resolve_location(positions, self.source.as_ref(), self.location_timeout).await;

        let request = {
            let mut inner = self.inner.lock();
            if !inner.is_current(token) {
                tracing::debug!("Discarding superseded location request");
                return LookupOutcome::Superseded;
            }

            match resolved {
                Ok(request) => {
                    inner.clear_if_elsewhere(&request.locator);
                    request
                }
                Err(e) => {
                    tracing::warn!("Could not determine device location: {e}");
                    let err = LookupError::from(e);
                    inner.view.phase = Phase::Failed;
                    inner.view.error = Some(err.clone());
                    return LookupOutcome::Failed(err);
                }
            }
        };

        self.run(token, request).await
    }

    /// Switch the unit system. A lookup still in flight is restarted, otherwise
    /// a displayed report is fetched again, by the same locator it was fetched
    /// with, under the new system.
    pub async fn set_units(&self, units: UnitSystem) -> Option<LookupOutcome> {
        let replay = {
            let mut inner = self.inner.lock();
            if inner.view.units == units {
                return None;
            }
            inner.view.units = units;

            inner.in_flight.clone().or_else(|| {
                inner.view.report.as_ref().map(|report| LookupRequest {
                    locator: report.locator.clone(),
                    label: match report.locator {
                        Locator::Coords(_) => Some(report.location.name.clone()),
                        Locator::City(_) => None,
                    },
                })
            })
        };

        match replay {
            Some(request) => Some(self.lookup(request).await),
            None => None,
        }
    }

    pub async fn toggle_units(&self) -> Option<LookupOutcome> {
        let next = self.units().toggled();
        self.set_units(next).await
    }

    fn begin(&self, target: Option<&Locator>) -> u64 {
        let mut inner = self.inner.lock();
        inner.latest_token += 1;
        inner.in_flight = None;

        if let Some(target) = target {
            inner.clear_if_elsewhere(target);
        }
        inner.view.phase = Phase::Loading;
        inner.view.error = None;

        inner.latest_token
    }

    async fn run(&self, token: u64, request: LookupRequest) -> LookupOutcome {
        let units = {
            let mut inner = self.inner.lock();
            if inner.is_current(token) {
                inner.in_flight = Some(request.clone());
            }
            inner.view.units
        };
        tracing::debug!("Lookup #{token} for {} ({units})", request.locator);

        let result = client::fetch_snapshot(self.source.as_ref(), &request.locator, units).await;

        let mut inner = self.inner.lock();
        if !inner.is_current(token) {
            tracing::debug!("Discarding superseded lookup #{token} for {}", request.locator);
            return LookupOutcome::Superseded;
        }
        inner.in_flight = None;

        match result {
            Ok(snapshot) => {
                let report = build_report(request, units, snapshot);
                inner.view.phase = Phase::Success;
                inner.view.report = Some(report.clone());
                inner.view.error = None;
                drop(inner);

                tracing::info!("Weather loaded for {}", report.location.display_name());
                self.preferences.lock().record_search(&report.location.name);
                LookupOutcome::Success(Box::new(report))
            }
            Err(e) => {
                let err = LookupError::from_fetch(&request.locator.to_string(), e);
                tracing::warn!("Lookup for {} failed: {err}", request.locator);

                let outcome = match err {
                    LookupError::NotFound { .. } => {
                        inner.view.phase = Phase::NotFound;
                        inner.view.report = None;
                        LookupOutcome::NotFound
                    }
                    _ => {
                        inner.view.phase = Phase::Failed;
                        LookupOutcome::Failed(err.clone())
                    }
                };
                inner.view.error = Some(err);
                outcome
            }
        }
    }
}

fn build_report(request: LookupRequest, units: UnitSystem, snapshot: Snapshot) -> WeatherReport {
    let Snapshot { current, forecast, air_quality, alerts } = snapshot;

    let mut location = current.location;
    if let Some(label) = request.label {
        location.name = label;
    }

    let air_quality = air_quality.map(|reading| AirQualitySample {
        location: location.clone(),
        aqi: reading.aqi,
        pollutants: reading.pollutants,
    });

    WeatherReport {
        locator: request.locator,
        location,
        units,
        current: current.conditions,
        hourly: derive_hourly(&forecast),
        daily: derive_daily(&forecast),
        air_quality,
        alerts,
        fetched_at: Utc::now(),
    }
}
