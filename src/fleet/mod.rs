//! Cannon fleet coordination
//!
//! This module owns everything that talks to more than one cannon at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              FanOutCoordinator               │
//! │                                              │
//! │   status ─┐                                  │
//! │   status ─┼─▶ wait for all ─▶ lowest gen     │
//! │   status ─┘        │          available      │
//! │                    │                         │
//! │             round deadline                   │
//! └────────────────────┬─────────────────────────┘
//!                      │ Selection
//!                      ▼
//! ┌──────────────────────────────────────────────┐
//! │                 Dispatcher                   │
//! │   fire once on the selected cannon, no retry │
//! └──────────────────────────────────────────────┘
//!
//!          both draw slots from one CallPool
//! ```

pub mod dispatch;
pub mod fanout;
pub mod pool;

use std::time::Duration;

use crate::cannon::CannonError;

pub use dispatch::Dispatcher;
pub use fanout::{select_best, FanOutCoordinator, Selection, StatusReport};
pub use pool::{CallPermit, CallPool};

// ============================================================================
// Configuration
// ============================================================================

/// Deadlines applied to cannon calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FleetConfig {
    /// Deadline for one status call
    pub status_timeout: Duration,

    /// Deadline for the fire call
    pub fire_timeout: Duration,

    /// Deadline for the whole status round
    pub round_timeout: Duration,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            status_timeout: Duration::from_secs(5),
            fire_timeout: Duration::from_secs(10),
            round_timeout: Duration::from_secs(15),
        }
    }
}

impl FleetConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), FleetError> {
        for (field, value) in [
            ("status_timeout", self.status_timeout),
            ("fire_timeout", self.fire_timeout),
            ("round_timeout", self.round_timeout),
        ] {
            if value.is_zero() {
                return Err(FleetError::InvalidConfig(format!(
                    "{field} must be greater than 0"
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by the fan-out round or the dispatcher
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    /// Call pool capacity must be at least one
    #[error("call pool capacity must be greater than 0 and below the semaphore limit")]
    InvalidCapacity,

    /// Invalid deadline configuration
    #[error("Invalid fleet configuration: {0}")]
    InvalidConfig(String),

    /// The call pool was closed for shutdown while waiting for a slot
    #[error("call pool closed, service is shutting down")]
    PoolClosed,

    /// No cannon reported itself available
    #[error("failed to fire: no available ion cannons ({queried} queried, {failed} failed)")]
    NoBackendAvailable { queried: usize, failed: usize },

    /// The fire call on the selected cannon failed
    #[error("fire command on {cannon} failed: {source}")]
    FireCommandFailed {
        cannon: String,
        #[source]
        source: CannonError,
    },

    /// The caller cancelled the attack
    #[error("attack cancelled")]
    Cancelled,
}

impl FleetError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoBackendAvailable { .. } | Self::Cancelled)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCapacity | Self::InvalidConfig(_) => "config_error",
            Self::PoolClosed => "shutting_down",
            Self::NoBackendAvailable { .. } => "no_backend_available",
            Self::FireCommandFailed { .. } => "fire_command_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FleetConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.round_timeout >= config.status_timeout);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = FleetConfig {
            fire_timeout: Duration::ZERO,
            ..FleetConfig::default()
        };
        assert!(matches!(config.validate(), Err(FleetError::InvalidConfig(_))));
    }

    #[test]
    fn test_error_messages() {
        let err = FleetError::NoBackendAvailable {
            queried: 3,
            failed: 1,
        };
        assert!(err.to_string().contains("no available ion cannons"));
        assert_eq!(err.kind(), "no_backend_available");
    }
}
