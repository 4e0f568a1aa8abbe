use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use stillsky_core::DemoConfig;

/// Entries per day in a 3-hour forecast series.
pub const ENTRIES_PER_DAY: usize = 8;

/// Days shown in the daily forecast view.
pub const FORECAST_DAYS: usize = 5;

/// Weather condition categories mapped from OpenWeatherMap condition ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Mist,
    Fog,
    Haze,
    Dust,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
    Squall,
    Tornado,
}

impl WeatherCondition {
    /// Convert an OpenWeatherMap condition id to WeatherCondition
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_condition_id(id: i32) -> Self {
        match id {
            200..=299 => Self::Thunderstorm,
            300..=399 => Self::Drizzle,
            500 | 501 | 520 | 521 => Self::Rain,
            502..=504 | 522 | 531 => Self::HeavyRain,
            511 => Self::Sleet, // Freezing rain
            611..=616 => Self::Sleet,
            600..=699 => Self::Snow,
            701 => Self::Mist,
            711 | 721 => Self::Haze,
            731 | 751 | 761 | 762 => Self::Dust,
            741 => Self::Fog,
            771 => Self::Squall,
            781 => Self::Tornado,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear, // 800 and unknown ids
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Mist => "Mist",
            Self::Fog => "Fog",
            Self::Haze => "Haze",
            Self::Dust => "Dust",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
            Self::Squall => "Squall",
            Self::Tornado => "Tornado",
        }
    }
}

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Upstream condition block: numeric id, category ("Clear", "Rain"), text and icon code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: i32,
    pub category: String,
    pub description: String,
    pub icon: String,
}

impl Condition {
    pub fn kind(&self) -> WeatherCondition {
        WeatherCondition::from_condition_id(self.id)
    }
}

/// One geocoding match before ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedPlace {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// A ranked search result. `id` is only meaningful within one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub id: String,
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationCandidate {
    pub fn from_place(place: GeocodedPlace, position: usize) -> Self {
        Self {
            id: format!("{}-{}-{}", place.latitude, place.longitude, position),
            name: place.name,
            country: place.country,
            state: place.state,
            latitude: place.latitude,
            longitude: place.longitude,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// "State, Country" or just the country
    pub fn region_label(&self) -> String {
        match &self.state {
            Some(state) => format!("{}, {}", state, self.country),
            None => self.country.clone(),
        }
    }
}

/// Current weather conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub country: String,
    pub coordinates: Coordinates,
    pub condition: Condition,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    pub pressure: u32,
    pub wind_speed: f64,
    pub wind_deg: Option<u16>,
    /// Meters
    pub visibility: Option<u32>,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub observed_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Build the fallback snapshot, with sunrise and sunset placed around `now`.
    pub fn from_demo(demo: &DemoConfig, now: DateTime<Utc>) -> Self {
        // Out-of-range offsets collapse both sun times onto `now`
        let offset = Duration::try_hours(demo.sun_offset_hours);
        let sunrise = offset
            .and_then(|o| now.checked_sub_signed(o))
            .unwrap_or(now);
        let sunset = offset
            .and_then(|o| now.checked_add_signed(o))
            .unwrap_or(now);
        Self {
            location_name: demo.name.clone(),
            country: demo.country.clone(),
            coordinates: Coordinates::new(demo.latitude, demo.longitude),
            condition: Condition {
                id: demo.condition_id,
                category: demo.condition.clone(),
                description: demo.description.clone(),
                icon: demo.icon.clone(),
            },
            temperature: demo.temperature,
            feels_like: demo.feels_like,
            temp_min: demo.temp_min,
            temp_max: demo.temp_max,
            humidity: demo.humidity,
            pressure: demo.pressure,
            wind_speed: demo.wind_speed,
            wind_deg: Some(demo.wind_deg),
            visibility: Some(demo.visibility),
            sunrise,
            sunset,
            observed_at: now,
        }
    }

    /// Visibility in kilometers, if reported
    pub fn visibility_km(&self) -> Option<f64> {
        self.visibility.map(|m| f64::from(m) / 1000.0)
    }
}

/// One 3-hour forecast step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub time: DateTime<Utc>,
    pub condition: Condition,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    pub pressure: u32,
    pub wind_speed: f64,
    /// Probability of precipitation, 0.0 to 1.0
    pub pop: f64,
}

impl ForecastEntry {
    /// Probability of precipitation as a whole percentage
    pub fn precipitation_chance(&self) -> u8 {
        (self.pop.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// Forecast at fixed 3-hour intervals, oldest first
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub city: String,
    pub country: String,
    pub entries: Vec<ForecastEntry>,
}

impl ForecastSeries {
    /// The first 24 hours: the first eight entries.
    pub fn next_24_hours(&self) -> &[ForecastEntry] {
        let end = self.entries.len().min(ENTRIES_PER_DAY);
        &self.entries[..end]
    }

    /// One entry per day: indices 0, 8, 16, 24, 32.
    pub fn next_5_days(&self) -> Vec<&ForecastEntry> {
        self.entries
            .iter()
            .step_by(ENTRIES_PER_DAY)
            .take(FORECAST_DAYS)
            .collect()
    }
}

/// Current conditions and forecast fetched together for the same place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub snapshot: WeatherSnapshot,
    pub forecast: ForecastSeries,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(index: i64) -> ForecastEntry {
        let start = Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap();
        ForecastEntry {
            time: start + Duration::hours(3 * index),
            condition: Condition {
                id: 800,
                category: "Clear".into(),
                description: "clear sky".into(),
                icon: "01d".into(),
            },
            temperature: index as f64,
            feels_like: index as f64,
            temp_min: index as f64,
            temp_max: index as f64,
            humidity: 50,
            pressure: 1012,
            wind_speed: 2.0,
            pop: 0.0,
        }
    }

    fn series(len: i64) -> ForecastSeries {
        ForecastSeries {
            city: "Oslo".into(),
            country: "NO".into(),
            entries: (0..len).map(entry).collect(),
        }
    }

    #[test]
    fn test_24_hour_view_is_first_eight_entries() {
        let forecast = series(40);
        let hours = forecast.next_24_hours();
        assert_eq!(hours.len(), 8);
        assert_eq!(hours, &forecast.entries[..8]);
    }

    #[test]
    fn test_5_day_view_takes_every_eighth_entry() {
        let forecast = series(40);
        let days: Vec<f64> = forecast
            .next_5_days()
            .iter()
            .map(|e| e.temperature)
            .collect();
        assert_eq!(days, vec![0.0, 8.0, 16.0, 24.0, 32.0]);
    }

    #[test]
    fn test_short_series_views() {
        let forecast = series(10);
        assert_eq!(forecast.next_24_hours().len(), 8);
        assert_eq!(forecast.next_5_days().len(), 2);

        let empty = ForecastSeries::default();
        assert!(empty.next_24_hours().is_empty());
        assert!(empty.next_5_days().is_empty());
    }

    #[test]
    fn test_precipitation_chance_rounds_and_clamps() {
        let mut e = entry(0);
        e.pop = 0.456;
        assert_eq!(e.precipitation_chance(), 46);
        e.pop = 1.7;
        assert_eq!(e.precipitation_chance(), 100);
    }

    #[test]
    fn test_demo_snapshot_sun_times_surround_now() {
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap();
        let snapshot = WeatherSnapshot::from_demo(&DemoConfig::default(), now);
        assert_eq!(snapshot.location_name, "New York");
        assert_eq!(snapshot.condition.category, "Clear");
        assert_eq!(snapshot.sunrise, now - Duration::hours(6));
        assert_eq!(snapshot.sunset, now + Duration::hours(6));
        assert_eq!(snapshot.visibility_km(), Some(10.0));
    }

    #[test]
    fn test_demo_snapshot_with_huge_sun_offset_does_not_panic() {
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap();
        let mut demo = DemoConfig::default();

        demo.sun_offset_hours = 100_000_000_000;
        let snapshot = WeatherSnapshot::from_demo(&demo, now);
        assert_eq!(snapshot.sunrise, now);
        assert_eq!(snapshot.sunset, now);

        demo.sun_offset_hours = i64::MIN;
        let snapshot = WeatherSnapshot::from_demo(&demo, now);
        assert_eq!(snapshot.sunrise, now);
        assert_eq!(snapshot.sunset, now);
    }

    #[test]
    fn test_candidate_id_and_region_label() {
        let candidate = LocationCandidate::from_place(
            GeocodedPlace {
                name: "Portland".into(),
                country: "US".into(),
                state: Some("Oregon".into()),
                latitude: 45.52,
                longitude: -122.67,
            },
            3,
        );
        assert_eq!(candidate.id, "45.52--122.67-3");
        assert_eq!(candidate.region_label(), "Oregon, US");
    }

    #[test]
    fn test_condition_id_clear() {
        assert_eq!(WeatherCondition::from_condition_id(800), WeatherCondition::Clear);
    }

    #[test]
    fn test_condition_id_clouds() {
        assert_eq!(WeatherCondition::from_condition_id(801), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_condition_id(804), WeatherCondition::Cloudy);
    }

    #[test]
    fn test_condition_id_precipitation() {
        assert_eq!(WeatherCondition::from_condition_id(310), WeatherCondition::Drizzle);
        assert_eq!(WeatherCondition::from_condition_id(500), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_condition_id(502), WeatherCondition::HeavyRain);
        assert_eq!(WeatherCondition::from_condition_id(511), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_condition_id(613), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_condition_id(601), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_condition_id(211), WeatherCondition::Thunderstorm);
    }

    #[test]
    fn test_condition_id_atmosphere() {
        assert_eq!(WeatherCondition::from_condition_id(701), WeatherCondition::Mist);
        assert_eq!(WeatherCondition::from_condition_id(741), WeatherCondition::Fog);
        assert_eq!(WeatherCondition::from_condition_id(781), WeatherCondition::Tornado);
    }

    #[test]
    fn test_condition_id_unknown_defaults_to_clear() {
        assert_eq!(WeatherCondition::from_condition_id(999), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_condition_id(-1), WeatherCondition::Clear);
    }
}
