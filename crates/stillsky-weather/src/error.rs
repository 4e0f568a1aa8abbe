use stillsky_core::{AppError, NetworkError, ReqwestErrorExt, WeatherError};

/// Location service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Geolocation is not supported")]
    Unsupported,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Upstream request errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Upstream returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Location error: {0}")]
    Location(#[from] LocationError),
    #[error("No coordinates or city name given")]
    NoTarget,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network(e.into_network_error())
    }
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Network(n) => AppError::Network(n),
            FetchError::Status { status, message } => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            FetchError::Parse(s) => AppError::Weather(WeatherError::MalformedPayload(s)),
            FetchError::Location(LocationError::PermissionDenied) => {
                AppError::Weather(WeatherError::LocationDenied)
            }
            FetchError::Location(other) => {
                AppError::Weather(WeatherError::LocationUnavailable(other.to_string()))
            }
            FetchError::NoTarget => AppError::Weather(WeatherError::NoLocation),
        }
    }
}
