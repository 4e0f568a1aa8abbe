//! OpenWeatherMap HTTP client: current conditions, 3-hour forecast and geocoding.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use stillsky_core::WeatherConfig;
use tracing::instrument;

use crate::error::FetchError;
use crate::types::{
    Condition, Coordinates, ForecastEntry, ForecastSeries, GeocodedPlace, WeatherSnapshot,
};

const USER_AGENT: &str = concat!("StillSky/", env!("CARGO_PKG_VERSION"));

/// Endpoint and credential settings, passed in rather than held globally.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub geo_url: String,
    pub icon_url: String,
    pub units: String,
    /// `None` waits forever
    pub timeout: Option<Duration>,
}

impl ApiConfig {
    /// Settings for a server under test; every endpoint family shares `base`.
    pub fn with_base(api_key: &str, base: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base.to_string(),
            geo_url: base.to_string(),
            icon_url: base.to_string(),
            units: "metric".to_string(),
            timeout: Some(Duration::from_secs(5)),
        }
    }
}

impl From<&WeatherConfig> for ApiConfig {
    fn from(config: &WeatherConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            geo_url: config.geo_url.trim_end_matches('/').to_string(),
            icon_url: config.icon_url.trim_end_matches('/').to_string(),
            units: config.units.clone(),
            timeout: (config.timeout_seconds > 0)
                .then(|| Duration::from_secs(config.timeout_seconds)),
        }
    }
}

/// Icon resolution token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconSize {
    #[default]
    Double,
    Quadruple,
}

impl IconSize {
    fn token(self) -> &'static str {
        match self {
            IconSize::Double => "2x",
            IconSize::Quadruple => "4x",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Arc<Client>,
    config: ApiConfig,
}

impl OpenWeatherClient {
    pub fn new(config: ApiConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    /// Static image URL for an upstream icon code, e.g. `01d`.
    pub fn icon_url(&self, icon_code: &str, size: IconSize) -> String {
        format!("{}/{}@{}.png", self.config.icon_url, icon_code, size.token())
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn current_by_coords(
        &self,
        coords: Coordinates,
    ) -> Result<WeatherSnapshot, FetchError> {
        let url = format!("{}/weather", self.config.base_url);
        let body: CurrentResponse = self
            .get_json(&url, &self.coordinate_params(coords), true)
            .await?;
        body.try_into()
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn current_by_city(&self, city: &str) -> Result<WeatherSnapshot, FetchError> {
        let url = format!("{}/weather", self.config.base_url);
        let body: CurrentResponse = self
            .get_json(&url, &[("q", city.to_string())], true)
            .await?;
        body.try_into()
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn forecast_by_coords(
        &self,
        coords: Coordinates,
    ) -> Result<ForecastSeries, FetchError> {
        let url = format!("{}/forecast", self.config.base_url);
        let body: ForecastResponse = self
            .get_json(&url, &self.coordinate_params(coords), true)
            .await?;
        body.try_into()
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn forecast_by_city(&self, city: &str) -> Result<ForecastSeries, FetchError> {
        let url = format!("{}/forecast", self.config.base_url);
        let body: ForecastResponse = self
            .get_json(&url, &[("q", city.to_string())], true)
            .await?;
        body.try_into()
    }

    /// Direct geocoding: place name to matches, at most `limit`.
    #[instrument(skip(self), level = "debug")]
    pub async fn geocode_direct(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<GeocodedPlace>, FetchError> {
        let url = format!("{}/direct", self.config.geo_url);
        let body: Vec<GeoResult> = self
            .get_json(
                &url,
                &[("q", query.to_string()), ("limit", limit.to_string())],
                false,
            )
            .await?;
        Ok(body.into_iter().map(GeocodedPlace::from).collect())
    }

    /// Reverse geocoding: coordinates to nearby named places, at most `limit`.
    #[instrument(skip(self), level = "debug")]
    pub async fn geocode_reverse(
        &self,
        coords: Coordinates,
        limit: u32,
    ) -> Result<Vec<GeocodedPlace>, FetchError> {
        let url = format!("{}/reverse", self.config.geo_url);
        let mut params = self.coordinate_params(coords);
        params.push(("limit", limit.to_string()));
        let body: Vec<GeoResult> = self.get_json(&url, &params, false).await?;
        Ok(body.into_iter().map(GeocodedPlace::from).collect())
    }

    fn coordinate_params(&self, coords: Coordinates) -> Vec<(&'static str, String)> {
        vec![
            ("lat", coords.latitude.to_string()),
            ("lon", coords.longitude.to_string()),
        ]
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
        with_units: bool,
    ) -> Result<T, FetchError> {
        let mut request = self
            .client
            .get(url)
            .query(params)
            .query(&[("appid", self.config.api_key.as_str())]);
        if with_units {
            request = request.query(&[("units", self.config.units.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!("{} returned {}", url, status);
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

// Upstream payloads. Only the fields StillSky reads are declared.

#[derive(Debug, Deserialize)]
struct ApiCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    id: i32,
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct ApiMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: u32,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct ApiWind {
    speed: f64,
    #[serde(default)]
    deg: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ApiSys {
    #[serde(default)]
    country: Option<String>,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    coord: ApiCoord,
    weather: Vec<ApiCondition>,
    main: ApiMain,
    #[serde(default)]
    visibility: Option<u32>,
    wind: ApiWind,
    dt: i64,
    sys: ApiSys,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiForecastItem {
    dt: i64,
    main: ApiMain,
    weather: Vec<ApiCondition>,
    wind: ApiWind,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct ApiCity {
    name: String,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ApiForecastItem>,
    city: ApiCity,
}

#[derive(Debug, Deserialize)]
struct GeoResult {
    name: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    state: Option<String>,
    lat: f64,
    lon: f64,
}

impl From<GeoResult> for GeocodedPlace {
    fn from(r: GeoResult) -> Self {
        Self {
            name: r.name,
            country: r.country,
            state: r.state,
            latitude: r.lat,
            longitude: r.lon,
        }
    }
}

fn timestamp(secs: i64, field: &str) -> Result<DateTime<Utc>, FetchError> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| FetchError::Parse(format!("{field} out of range: {secs}")))
}

fn first_condition(conditions: Vec<ApiCondition>) -> Result<Condition, FetchError> {
    let c = conditions
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::Parse("payload has no weather condition".to_string()))?;
    Ok(Condition {
        id: c.id,
        category: c.main,
        description: c.description,
        icon: c.icon,
    })
}

impl TryFrom<CurrentResponse> for WeatherSnapshot {
    type Error = FetchError;

    fn try_from(r: CurrentResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            location_name: r.name,
            country: r.sys.country.unwrap_or_default(),
            coordinates: Coordinates::new(r.coord.lat, r.coord.lon),
            condition: first_condition(r.weather)?,
            temperature: r.main.temp,
            feels_like: r.main.feels_like,
            temp_min: r.main.temp_min,
            temp_max: r.main.temp_max,
            humidity: r.main.humidity,
            pressure: r.main.pressure,
            wind_speed: r.wind.speed,
            wind_deg: r.wind.deg,
            visibility: r.visibility,
            sunrise: timestamp(r.sys.sunrise, "sunrise")?,
            sunset: timestamp(r.sys.sunset, "sunset")?,
            observed_at: timestamp(r.dt, "dt")?,
        })
    }
}

impl TryFrom<ForecastResponse> for ForecastSeries {
    type Error = FetchError;

    fn try_from(r: ForecastResponse) -> Result<Self, Self::Error> {
        let entries = r
            .list
            .into_iter()
            .map(|item| {
                Ok(ForecastEntry {
                    time: timestamp(item.dt, "dt")?,
                    condition: first_condition(item.weather)?,
                    temperature: item.main.temp,
                    feels_like: item.main.feels_like,
                    temp_min: item.main.temp_min,
                    temp_max: item.main.temp_max,
                    humidity: item.main.humidity,
                    pressure: item.main.pressure,
                    wind_speed: item.wind.speed,
                    pop: item.pop,
                })
            })
            .collect::<Result<Vec<_>, FetchError>>()?;

        Ok(Self {
            city: r.city.name,
            country: r.city.country.unwrap_or_default(),
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn current_body() -> serde_json::Value {
        serde_json::json!({
            "coord": {"lon": 10.75, "lat": 59.91},
            "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
            "main": {
                "temp": 7.4, "feels_like": 5.1, "temp_min": 6.0, "temp_max": 8.2,
                "pressure": 1004, "humidity": 87
            },
            "visibility": 9000,
            "wind": {"speed": 4.6, "deg": 200},
            "dt": 1760522400,
            "sys": {"country": "NO", "sunrise": 1760506800, "sunset": 1760543400},
            "name": "Oslo"
        })
    }

    #[tokio::test]
    async fn test_current_by_coords_sends_key_units_and_position() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("lat", "59.91"))
            .and(query_param("lon", "10.75"))
            .and(query_param("appid", "test_key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            OpenWeatherClient::new(ApiConfig::with_base("test_key", &mock_server.uri())).unwrap();
        let snapshot = client
            .current_by_coords(Coordinates::new(59.91, 10.75))
            .await
            .unwrap();

        assert_eq!(snapshot.location_name, "Oslo");
        assert_eq!(snapshot.country, "NO");
        assert_eq!(snapshot.condition.category, "Rain");
        assert_eq!(snapshot.humidity, 87);
        assert_eq!(snapshot.visibility_km(), Some(9.0));
        assert_eq!(snapshot.sunrise.timestamp(), 1760506800);
    }

    #[tokio::test]
    async fn test_current_by_city_uses_q_param() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "São Paulo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            OpenWeatherClient::new(ApiConfig::with_base("test_key", &mock_server.uri())).unwrap();
        assert!(client.current_by_city("São Paulo").await.is_ok());
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&mock_server)
            .await;

        let client =
            OpenWeatherClient::new(ApiConfig::with_base("bad", &mock_server.uri())).unwrap();
        let err = client
            .forecast_by_coords(Coordinates::new(1.0, 2.0))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Oslo"
            })))
            .mount(&mock_server)
            .await;

        let client =
            OpenWeatherClient::new(ApiConfig::with_base("test_key", &mock_server.uri())).unwrap();
        let err = client.current_by_city("Oslo").await.unwrap_err();

        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_empty_condition_list_is_parse_error() {
        let mock_server = MockServer::start().await;
        let mut body = current_body();
        body["weather"] = serde_json::json!([]);

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;

        let client =
            OpenWeatherClient::new(ApiConfig::with_base("test_key", &mock_server.uri())).unwrap();
        let err = client.current_by_city("Oslo").await.unwrap_err();

        assert!(err.to_string().contains("no weather condition"));
    }

    #[tokio::test]
    async fn test_geocode_direct_omits_units() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/direct"))
            .and(query_param("q", "Paris"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Paris", "country": "FR", "lat": 48.8589, "lon": 2.3200},
                {"name": "Paris", "country": "US", "state": "Texas", "lat": 33.6609, "lon": -95.5555}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            OpenWeatherClient::new(ApiConfig::with_base("test_key", &mock_server.uri())).unwrap();
        let places = client.geocode_direct("Paris", 10).await.unwrap();

        assert_eq!(places.len(), 2);
        assert_eq!(places[1].state.as_deref(), Some("Texas"));

        let requests = mock_server.received_requests().await.unwrap();
        assert!(requests[0].url.query().is_some_and(|q| !q.contains("units")));
    }

    #[test]
    fn test_icon_url() {
        let client = OpenWeatherClient::new(ApiConfig::from(&WeatherConfig::default())).unwrap();
        assert_eq!(
            client.icon_url("10d", IconSize::Double),
            "https://openweathermap.org/img/wn/10d@2x.png"
        );
        assert_eq!(
            client.icon_url("01n", IconSize::Quadruple),
            "https://openweathermap.org/img/wn/01n@4x.png"
        );
    }

    #[test]
    fn test_zero_timeout_disables_timeout() {
        let mut config = WeatherConfig::default();
        config.timeout_seconds = 0;
        assert_eq!(ApiConfig::from(&config).timeout, None);
    }
}
