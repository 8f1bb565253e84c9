//! endor - target selection and ion cannon coordination
//!
//! Picks one target from a radar scan by running it through an ordered
//! pipeline of targeting protocols, asks every ion cannon for its status
//! concurrently, and fires the available cannon with the lowest generation.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`] - Core data structures and types
//! - [`protocol`] - Targeting protocols and the selection pipeline
//! - [`cannon`] - Ion cannon backend trait and HTTP client
//! - [`fleet`] - Call pool, concurrent status round, and fire dispatch
//! - [`service`] - Attack orchestration
//! - [`server`] - HTTP transport
//! - [`config`] - Configuration management and settings
//! - [`metrics`] - Prometheus metrics
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use endor::config::Config;
//! use endor::service::EndorService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let service = EndorService::from_config(&config)?;
//!     println!("{} cannons configured", service.cannon_count());
//!     Ok(())
//! }
//! ```

pub mod cannon;
pub mod config;
pub mod error;
pub mod fleet;
pub mod metrics;
pub mod models;
pub mod protocol;
pub mod server;
pub mod service;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cannon::{CannonStatus, FireOutcome, IonCannon, IonCannonClient};
    pub use crate::config::Config;
    pub use crate::error::{EndorErrorTrait, Error, ErrorCategory, Result};
    pub use crate::fleet::{CallPool, FleetConfig, FleetError};
    pub use crate::models::{AttackReport, Coordinate, Enemy, EnemyType, Radar, Scan};
    pub use crate::protocol::{Pipeline, ProtocolType, Stage};
    pub use crate::service::EndorService;
}

// Direct re-exports for convenience
pub use models::{AttackReport, Coordinate, Radar, Scan};
