//! Ion cannon backends
//!
//! Every cannon is an independently owned weapon system exposing two remote
//! operations: a status check and a fire command. The [`IonCannon`] trait is
//! the seam the fleet coordinator works against; [`client::IonCannonClient`]
//! is the HTTP implementation used in production.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use client::{IonCannonClient, IonCannonClientConfig};

/// Result type for cannon operations
pub type CannonResult<T> = Result<T, CannonError>;

/// Errors that can occur while talking to a cannon
#[derive(Debug, thiserror::Error)]
pub enum CannonError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Cannon answered with a non-success status
    #[error("cannon responded with HTTP {status}")]
    HttpStatus { status: u16 },

    /// Response body could not be decoded
    #[error("failed to decode cannon response: {0}")]
    Decode(String),

    /// Invalid cannon configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Call exceeded its deadline
    #[error("cannon call timed out after {0:?}")]
    Timeout(Duration),

    /// Call abandoned because the round or the caller was cancelled
    #[error("cannon call cancelled")]
    Cancelled,

    /// Generic error
    #[error("Cannon error: {0}")]
    Other(String),
}

impl CannonError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidConfig(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "cannon_timeout",
            Self::Cancelled => "cancelled",
            Self::InvalidConfig(_) => "config_error",
            _ => "cannon_error",
        }
    }
}

/// Status reported by a cannon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CannonStatus {
    pub generation: u32,
    pub available: bool,
}

/// Result of a fire command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireOutcome {
    pub casualties: u32,
    pub generation: u32,
}

/// Trait for ion cannon backends
#[async_trait]
pub trait IonCannon: Send + Sync {
    /// Name used in logs and status listings
    fn name(&self) -> &str;

    /// Ask the cannon for its generation and availability
    async fn check_status(&self) -> CannonResult<CannonStatus>;

    /// Fire at `(x, y)` against `enemies` enemies
    async fn fire_command(&self, x: u32, y: u32, enemies: u32) -> CannonResult<FireOutcome>;
}
