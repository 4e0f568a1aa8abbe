//! Fetch cycle state for the presentation layer.
//!
//! Every `begin` issues a newer ticket. Only the newest ticket may complete,
//! so a slow response can never overwrite a fresher one.

use crate::orchestrator::{Advisory, FetchOutcome, FetchTarget};
use crate::types::{Coordinates, ForecastSeries, WeatherReport, WeatherSnapshot};

/// Identifies one fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading {
        target: FetchTarget,
    },
    Success {
        report: WeatherReport,
        display_name: String,
    },
    Fallback {
        snapshot: WeatherSnapshot,
        advisory: Advisory,
    },
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading { .. })
    }

    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        match self {
            FetchState::Success { report, .. } => Some(&report.snapshot),
            FetchState::Fallback { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }

    pub fn forecast(&self) -> Option<&ForecastSeries> {
        match self {
            FetchState::Success { report, .. } => Some(&report.forecast),
            _ => None,
        }
    }

    pub fn advisory(&self) -> Option<Advisory> {
        match self {
            FetchState::Fallback { advisory, .. } => Some(*advisory),
            _ => None,
        }
    }
}

impl From<FetchOutcome> for FetchState {
    fn from(outcome: FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Success {
                report,
                display_name,
            } => FetchState::Success {
                report,
                display_name,
            },
            FetchOutcome::Fallback { snapshot, advisory } => {
                FetchState::Fallback { snapshot, advisory }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct FetchSession {
    state: FetchState,
    latest: u64,
    displayed: Option<Coordinates>,
}

impl FetchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Enter Loading and issue the ticket that may complete this cycle.
    pub fn begin(&mut self, target: FetchTarget) -> Ticket {
        self.latest += 1;
        tracing::debug!("Fetch cycle {} started for {:?}", self.latest, target);
        self.state = FetchState::Loading { target };
        Ticket(self.latest)
    }

    /// Apply `outcome` if `ticket` is the newest; returns whether it was applied.
    pub fn complete(&mut self, ticket: Ticket, outcome: FetchOutcome) -> bool {
        if ticket.0 != self.latest {
            tracing::debug!(
                "Discarding fetch cycle {} (cycle {} is newer)",
                ticket.0,
                self.latest
            );
            return false;
        }

        self.displayed = Some(outcome.snapshot().coordinates);
        self.state = outcome.into();
        true
    }

    /// Coordinates of the snapshot last put on display.
    pub fn refresh_target(&self) -> Option<FetchTarget> {
        self.displayed.map(FetchTarget::Coordinates)
    }
}
