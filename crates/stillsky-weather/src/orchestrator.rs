//! One fetch cycle: current conditions and forecast requested together,
//! with demo data substituted on any failure.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use stillsky_core::{AppError, DemoConfig};

use crate::client::OpenWeatherClient;
use crate::error::{FetchError, LocationError};
use crate::geocode::LocationResolver;
use crate::location::{Geolocator, Unsupported};
use crate::session::{FetchSession, FetchState};
use crate::types::{Coordinates, ForecastSeries, WeatherReport, WeatherSnapshot};

/// Display name shown alongside demo data.
pub const DEMO_LOCATION_NAME: &str = "Demo Location";

/// What to fetch weather for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchTarget {
    Coordinates(Coordinates),
    City(String),
    /// Ask the orchestrator's geolocator first
    CurrentPosition,
}

/// Why demo data is being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advisory {
    FetchFailed,
    LocationDenied,
    GeolocationUnsupported,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Advisory::FetchFailed => "Unable to fetch weather data. Using demo data.",
            Advisory::LocationDenied => "Location access denied. Using demo data.",
            Advisory::GeolocationUnsupported => "Geolocation not supported. Using demo data.",
        }
    }
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success {
        report: WeatherReport,
        display_name: String,
    },
    /// Demo snapshot only; no forecast
    Fallback {
        snapshot: WeatherSnapshot,
        advisory: Advisory,
    },
}

impl FetchOutcome {
    pub fn snapshot(&self) -> &WeatherSnapshot {
        match self {
            FetchOutcome::Success { report, .. } => &report.snapshot,
            FetchOutcome::Fallback { snapshot, .. } => snapshot,
        }
    }

    pub fn forecast(&self) -> Option<&ForecastSeries> {
        match self {
            FetchOutcome::Success { report, .. } => Some(&report.forecast),
            FetchOutcome::Fallback { .. } => None,
        }
    }

    pub fn advisory(&self) -> Option<Advisory> {
        match self {
            FetchOutcome::Success { .. } => None,
            FetchOutcome::Fallback { advisory, .. } => Some(*advisory),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            FetchOutcome::Success { display_name, .. } => display_name,
            FetchOutcome::Fallback { .. } => DEMO_LOCATION_NAME,
        }
    }
}

pub struct WeatherOrchestrator {
    client: OpenWeatherClient,
    resolver: LocationResolver,
    demo: DemoConfig,
    geolocator: Arc<dyn Geolocator>,
}

impl WeatherOrchestrator {
    /// Starts with no position source; see [`Self::with_geolocator`].
    pub fn new(client: OpenWeatherClient, resolver: LocationResolver, demo: DemoConfig) -> Self {
        Self {
            client,
            resolver,
            demo,
            geolocator: Arc::new(Unsupported),
        }
    }

    pub fn with_geolocator(mut self, geolocator: Arc<dyn Geolocator>) -> Self {
        self.geolocator = geolocator;
        self
    }

    /// Run one fetch. Never fails: errors become [`FetchOutcome::Fallback`].
    pub async fn fetch(&self, target: &FetchTarget) -> FetchOutcome {
        let result = match target {
            FetchTarget::Coordinates(coords) => self.fetch_by_coords(*coords).await,
            FetchTarget::City(city) => self.fetch_by_city(city).await,
            FetchTarget::CurrentPosition => {
                return self.fetch_current_position(self.geolocator.as_ref()).await;
            }
        };
        self.settle(result)
    }

    /// Ask `geolocator` for a position, then fetch for it. A geolocation
    /// failure falls back straight away, without touching the network.
    pub async fn fetch_current_position(&self, geolocator: &dyn Geolocator) -> FetchOutcome {
        match geolocator.current_position().await {
            Ok(coords) => {
                tracing::info!("Got location: {}", coords);
                let result = self.fetch_by_coords(coords).await;
                self.settle(result)
            }
            Err(e) => {
                let advisory = advisory_for_location(&e);
                let err = AppError::from(FetchError::from(e));
                tracing::warn!("Geolocation failed: {} ({})", err, err.user_message());
                self.fallback(advisory)
            }
        }
    }

    fn settle(&self, result: Result<(WeatherReport, String), FetchError>) -> FetchOutcome {
        match result {
            Ok((report, display_name)) => {
                tracing::info!(
                    "Fetched weather for {} ({} forecast entries)",
                    display_name,
                    report.forecast.entries.len()
                );
                FetchOutcome::Success {
                    report,
                    display_name,
                }
            }
            Err(e) => {
                let err = AppError::from(e);
                tracing::warn!("Weather fetch failed: {} ({})", err, err.user_message());
                self.fallback(Advisory::FetchFailed)
            }
        }
    }

    /// Begin, fetch and complete a cycle on `session`.
    ///
    /// The session stays borrowed for the whole fetch, so cycles run through
    /// here never overlap. Callers that keep several fetches in flight use
    /// [`FetchSession::begin`], [`Self::fetch`] and [`FetchSession::complete`]
    /// directly; only the newest ticket's outcome is applied.
    pub async fn run<'s>(
        &self,
        session: &'s mut FetchSession,
        target: FetchTarget,
    ) -> &'s FetchState {
        let ticket = session.begin(target.clone());
        let outcome = self.fetch(&target).await;
        session.complete(ticket, outcome);
        session.state()
    }

    /// Re-fetch for the coordinates currently on display; no-op when nothing is shown.
    pub async fn refresh<'s>(&self, session: &'s mut FetchSession) -> &'s FetchState {
        match session.refresh_target() {
            Some(target) => self.run(session, target).await,
            None => {
                tracing::debug!("Nothing displayed yet, refresh skipped");
                session.state()
            }
        }
    }

    async fn fetch_by_coords(
        &self,
        coords: Coordinates,
    ) -> Result<(WeatherReport, String), FetchError> {
        let (snapshot, forecast) = tokio::join!(
            self.client.current_by_coords(coords),
            self.client.forecast_by_coords(coords),
        );
        let report = WeatherReport {
            snapshot: snapshot?,
            forecast: forecast?,
        };
        let display_name = self.resolver.describe(coords).await;
        Ok((report, display_name))
    }

    async fn fetch_by_city(&self, city: &str) -> Result<(WeatherReport, String), FetchError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(FetchError::NoTarget);
        }

        let (snapshot, forecast) = tokio::join!(
            self.client.current_by_city(city),
            self.client.forecast_by_city(city),
        );
        let report = WeatherReport {
            snapshot: snapshot?,
            forecast: forecast?,
        };
        let display_name = format!(
            "{}, {}",
            report.snapshot.location_name, report.snapshot.country
        );
        Ok((report, display_name))
    }

    fn fallback(&self, advisory: Advisory) -> FetchOutcome {
        FetchOutcome::Fallback {
            snapshot: WeatherSnapshot::from_demo(&self.demo, Utc::now()),
            advisory,
        }
    }
}

fn advisory_for_location(err: &LocationError) -> Advisory {
    match err {
        LocationError::PermissionDenied => Advisory::LocationDenied,
        LocationError::Unsupported | LocationError::Timeout | LocationError::Other(_) => {
            Advisory::GeolocationUnsupported
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advisory_messages() {
        assert_eq!(
            Advisory::FetchFailed.message(),
            "Unable to fetch weather data. Using demo data."
        );
        assert_eq!(
            Advisory::GeolocationUnsupported.to_string(),
            "Geolocation not supported. Using demo data."
        );
    }

    #[test]
    fn test_only_denial_reads_as_denied() {
        assert_eq!(
            advisory_for_location(&LocationError::PermissionDenied),
            Advisory::LocationDenied
        );
        assert_eq!(
            advisory_for_location(&LocationError::Timeout),
            Advisory::GeolocationUnsupported
        );
        assert_eq!(
            advisory_for_location(&LocationError::Other("no fix".into())),
            Advisory::GeolocationUnsupported
        );
    }

    #[test]
    fn test_fallback_outcome_accessors() {
        let outcome = FetchOutcome::Fallback {
            snapshot: WeatherSnapshot::from_demo(&DemoConfig::default(), Utc::now()),
            advisory: Advisory::FetchFailed,
        };
        assert_eq!(outcome.display_name(), DEMO_LOCATION_NAME);
        assert!(outcome.forecast().is_none());
        assert_eq!(outcome.snapshot().location_name, "New York");
    }
}
