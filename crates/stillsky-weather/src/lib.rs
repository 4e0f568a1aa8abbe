//! Weather service for StillSky
//!
//! Ranked city search over OpenWeatherMap geocoding, and a fetch cycle that
//! pairs current conditions with the 3-hour forecast, substituting demo data
//! when the upstream cannot be reached.

pub mod client;
pub mod error;
pub mod geocode;
pub mod location;
pub mod orchestrator;
pub mod session;
pub mod types;

pub use client::{ApiConfig, IconSize, OpenWeatherClient};
pub use error::{FetchError, LocationError};
pub use geocode::{LocationResolver, UNKNOWN_LOCATION};
pub use location::{FixedPosition, Geolocator, Unsupported};
pub use orchestrator::{
    Advisory, FetchOutcome, FetchTarget, WeatherOrchestrator, DEMO_LOCATION_NAME,
};
pub use session::{FetchSession, FetchState, Ticket};
pub use types::*;
