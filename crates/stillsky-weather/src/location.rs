//! Device position sources.

use async_trait::async_trait;

use crate::error::LocationError;
use crate::types::Coordinates;

/// One-shot current position; no continuous tracking.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Reports a position chosen up front (command line or config).
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl Geolocator for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

/// For hosts with no position source.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

#[async_trait]
impl Geolocator for Unsupported {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_position_reports_its_coordinates() {
        let geo = FixedPosition(Coordinates::new(47.6062, -122.3321));
        assert_eq!(
            geo.current_position().await,
            Ok(Coordinates::new(47.6062, -122.3321))
        );
    }

    #[tokio::test]
    async fn unsupported_always_errors() {
        assert_eq!(
            Unsupported.current_position().await,
            Err(LocationError::Unsupported)
        );
    }
}
