//! HTTP transport for the attack service
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │            Endor Server              │
//! │                                      │
//! │  ┌────────────────────────────────┐  │
//! │  │           REST API             │  │
//! │  │  POST /attack                  │  │
//! │  │  GET  /api/health              │  │
//! │  │  GET  /api/cannons             │  │
//! │  │  GET  /metrics                 │  │
//! │  └───────────────┬────────────────┘  │
//! │                  │                   │
//! │  ┌───────────────▼────────────────┐  │
//! │  │         EndorService           │  │
//! │  └────────────────────────────────┘  │
//! └──────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use endor::server::{EndorServer, ServerConfig};
//!
//! let server = EndorServer::new(ServerConfig::default(), service)?;
//! server.start().await?;
//! ```

pub mod api;
pub mod config;
#[allow(clippy::module_inception)]
pub mod server;

pub use api::{attack_routes, query_routes, status_for, AttackRequest, ErrorResponse};
pub use config::ServerConfig;
pub use server::{AppState, EndorServer, ServerError, ServerInfo, REQUEST_ID_HEADER};
