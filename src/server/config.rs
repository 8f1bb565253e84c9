//! HTTP server configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_BIND_ADDRESS: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 3000);

/// Configuration for the HTTP server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Enable CORS for API
    pub enable_cors: bool,

    /// Enable request logging
    pub enable_request_logging: bool,

    /// Timeout in seconds for the read-only routes; `/attack` is bounded by the fleet deadlines
    pub request_timeout_secs: u64,

    /// Grace period for in-flight requests on shutdown, in seconds
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS,
            enable_cors: true,
            enable_request_logging: true,
            request_timeout_secs: 10,
            shutdown_grace_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Builder for ServerConfig
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    bind_address: Option<SocketAddr>,
    enable_cors: Option<bool>,
    enable_request_logging: Option<bool>,
    request_timeout_secs: Option<u64>,
    shutdown_grace_secs: Option<u64>,
}

impl ServerConfigBuilder {
    /// Set bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = Some(addr);
        self
    }

    /// Set bind address from string
    pub fn bind_address_str(mut self, addr: &str) -> Result<Self, ConfigError> {
        self.bind_address = Some(addr.parse().map_err(|_| ConfigError::InvalidValue {
            field: "bind_address".to_string(),
            reason: format!("Invalid address: {}", addr),
        })?);
        Ok(self)
    }

    /// Enable/disable CORS
    pub fn enable_cors(mut self, enable: bool) -> Self {
        self.enable_cors = Some(enable);
        self
    }

    /// Enable/disable request logging
    pub fn enable_request_logging(mut self, enable: bool) -> Self {
        self.enable_request_logging = Some(enable);
        self
    }

    /// Set request timeout
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Set shutdown grace period
    pub fn shutdown_grace_secs(mut self, secs: u64) -> Self {
        self.shutdown_grace_secs = Some(secs);
        self
    }

    /// Build the config
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let defaults = ServerConfig::default();
        let config = ServerConfig {
            bind_address: self.bind_address.unwrap_or(defaults.bind_address),
            enable_cors: self.enable_cors.unwrap_or(defaults.enable_cors),
            enable_request_logging: self
                .enable_request_logging
                .unwrap_or(defaults.enable_request_logging),
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            shutdown_grace_secs: self
                .shutdown_grace_secs
                .unwrap_or(defaults.shutdown_grace_secs),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
