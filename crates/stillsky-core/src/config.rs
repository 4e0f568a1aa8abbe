use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable that overrides `weather.api_key`.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream API settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Location search tuning
    #[serde(default)]
    pub search: SearchConfig,

    /// Snapshot shown when live data cannot be fetched
    #[serde(default)]
    pub demo: DemoConfig,

    /// Position reported by the fixed geolocator
    #[serde(default)]
    pub location: FixedLocationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Render a metric reading in this unit, rounded to whole degrees.
    pub fn format(self, celsius: f64) -> String {
        // `+ 0.0` turns a rounded -0 into 0
        match self {
            TemperatureUnit::Celsius => format!("{}°C", celsius.round() + 0.0),
            TemperatureUnit::Fahrenheit => {
                format!("{}°F", (celsius * 9.0 / 5.0 + 32.0).round() + 0.0)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key (overridden by `OPENWEATHER_API_KEY`)
    pub api_key: String,

    /// Current-conditions and forecast endpoints live under this URL
    pub base_url: String,

    /// Geocoding endpoints live under this URL
    pub geo_url: String,

    /// Condition icons live under this URL
    pub icon_url: String,

    /// Upstream unit system
    pub units: String,

    /// Per-request timeout; 0 waits forever
    pub timeout_seconds: u64,

    pub temperature_unit: TemperatureUnit,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            geo_url: "https://api.openweathermap.org/geo/1.0".to_string(),
            icon_url: "https://openweathermap.org/img/wn".to_string(),
            units: "metric".to_string(),
            timeout_seconds: 10,
            temperature_unit: TemperatureUnit::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Queries shorter than this return no candidates
    pub min_query_len: usize,

    /// Upstream result limit for each query variant
    pub per_variant_limit: u32,

    /// Candidates returned after ranking
    pub max_results: usize,

    /// Candidates closer than this (degrees, both axes) are duplicates
    pub dedup_epsilon: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: 2,
            per_variant_limit: 10,
            max_results: 8,
            dedup_epsilon: 0.01,
        }
    }
}

/// Demo snapshot literal. Sunrise/sunset are placed `sun_offset_hours`
/// either side of the moment the fallback is produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub condition_id: i32,
    pub condition: String,
    pub description: String,
    pub icon: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: u32,
    pub humidity: u8,
    pub wind_speed: f64,
    pub wind_deg: u16,
    pub visibility: u32,
    pub sun_offset_hours: i64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            name: "New York".to_string(),
            country: "US".to_string(),
            latitude: 40.7128,
            longitude: -74.006,
            condition_id: 800,
            condition: "Clear".to_string(),
            description: "clear sky".to_string(),
            icon: "01d".to_string(),
            temperature: 22.0,
            feels_like: 24.0,
            temp_min: 18.0,
            temp_max: 26.0,
            pressure: 1013,
            humidity: 65,
            wind_speed: 3.5,
            wind_deg: 230,
            visibility: 10_000,
            sun_offset_hours: 6,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixedLocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl FixedLocationConfig {
    /// Both coordinates, or nothing.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields defaults; nothing is written.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            toml::from_str::<Config>(&contents)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?
        } else {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            Self::default()
        };

        config.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors; warnings
    /// are handed back for the caller to report.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = Self::load(path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        Ok((config, validation))
    }

    /// A non-empty override replaces the configured API key.
    pub fn apply_api_key_override(&mut self, value: Option<String>) {
        if let Some(key) = value.filter(|k| !k.trim().is_empty()) {
            self.weather.api_key = key.trim().to_string();
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        self.validate_url(&self.weather.geo_url, "weather.geo_url", &mut result);
        self.validate_url(&self.weather.icon_url, "weather.icon_url", &mut result);

        if self.weather.api_key.is_empty() {
            result.add_warning(
                "weather.api_key",
                format!("No API key configured (set {API_KEY_ENV}); demo data will be shown"),
            );
        }

        if !["metric", "imperial", "standard"].contains(&self.weather.units.as_str()) {
            result.add_error(
                "weather.units",
                format!("Unknown unit system '{}'", self.weather.units),
            );
        } else if self.weather.units != "metric" {
            result.add_warning(
                "weather.units",
                "Temperatures are formatted assuming metric readings",
            );
        }

        if self.weather.timeout_seconds == 0 {
            result.add_warning(
                "weather.timeout_seconds",
                "Request timeout disabled; a hung request blocks its fetch",
            );
        } else if self.weather.timeout_seconds > 300 {
            result.add_error("weather.timeout_seconds", "Timeout cannot exceed 300 seconds");
        }

        if self.search.min_query_len == 0 {
            result.add_error("search.min_query_len", "Minimum query length must be at least 1");
        }
        if self.search.max_results == 0 {
            result.add_error("search.max_results", "Must return at least one result");
        }
        if self.search.per_variant_limit == 0 {
            result.add_error("search.per_variant_limit", "Lookup limit must be at least 1");
        }
        if !(self.search.dedup_epsilon >= 0.0) {
            result.add_error("search.dedup_epsilon", "Epsilon must be a non-negative number");
        }

        if !(0..=24).contains(&self.demo.sun_offset_hours) {
            result.add_error(
                "demo.sun_offset_hours",
                "Sun offset must be within 0..24 hours",
            );
        }

        if self.demo.humidity > 100 {
            result.add_error("demo.humidity", "Humidity is a percentage (0-100)");
        }

        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    result.add_error("location.latitude", "Latitude must be within -90..90");
                }
                if !(-180.0..=180.0).contains(&lon) {
                    result.add_error("location.longitude", "Longitude must be within -180..180");
                }
            }
            (None, None) => {}
            _ => result.add_error(
                "location",
                "Set both latitude and longitude, or neither",
            ),
        }

        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            result.add_error(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_log_levels.join(", ")
                ),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }
                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Write configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        std::fs::write(path, self.to_toml()?).context("Failed to write config file")?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Get the path to the default configuration file
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("stillsky");

        Ok(config_dir.join("config.toml"))
    }
}
