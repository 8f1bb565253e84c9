//! Configuration management for the endor service
//!
//! Configuration is loaded once at startup from, in increasing precedence:
//! built-in defaults, an optional TOML file, and environment variables
//! (after an optional `.env` file has been loaded by the binary). Command-line
//! flags are applied last by the commands themselves.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::fleet::FleetConfig;
use crate::protocol::DEFAULT_MAX_DISTANCE;

/// Prefix of the numbered cannon URL variables (`ION_CANNON_URL1`, `ION_CANNON_URL2`, ...)
pub const CANNON_URL_PREFIX: &str = "ION_CANNON_URL";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deployment environment (`dev`, `test`, `production`, ...)
    pub environment: String,

    /// HTTP server configuration
    pub server: ServerSettings,

    /// Cannon fleet configuration
    pub fleet: FleetSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address
    pub bind_address: String,

    /// Enable permissive CORS
    pub enable_cors: bool,

    /// Enable request tracing
    pub enable_request_logging: bool,

    /// Timeout in seconds for the read-only routes
    pub request_timeout_secs: u64,
}

/// Cannon fleet settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetSettings {
    /// Base URLs of the ion cannons, in configured order
    pub cannon_urls: Vec<String>,

    /// Process-wide cap on simultaneous cannon calls
    pub max_concurrent_calls: usize,

    /// Per status call timeout in milliseconds
    pub status_timeout_ms: u64,

    /// Fire call timeout in milliseconds
    pub fire_timeout_ms: u64,

    /// Whole status round timeout in milliseconds
    pub round_timeout_ms: u64,

    /// Range limit applied ahead of every pipeline
    pub max_distance: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); derived from the environment when unset
    pub level: Option<String>,

    /// Log format (text, json)
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: String::from("production"),
            server: ServerSettings::default(),
            fleet: FleetSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0:3000"),
            enable_cors: true,
            enable_request_logging: true,
            request_timeout_secs: 10,
        }
    }
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            cannon_urls: Vec::new(),
            max_concurrent_calls: 1000,
            status_timeout_ms: 5_000,
            fire_timeout_ms: 10_000,
            round_timeout_ms: 15_000,
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// Missing sections and keys fall back to their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::config(format!("failed to parse TOML config file {}: {}", path.display(), e))
        })
    }

    /// Load a `.env` file from the working directory or its parents
    ///
    /// Returns `Ok(false)` when there is none. A file that exists but cannot
    /// be read or parsed is an error.
    pub fn load_dotenv() -> Result<bool> {
        dotenv_loaded(dotenvy::dotenv())
    }

    /// Load a specific `.env` file
    pub fn load_dotenv_from(path: &Path) -> Result<bool> {
        dotenv_loaded(dotenvy::from_path(path))
    }

    /// Load the optional file, overlay the process environment, and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |_| {})
    }

    /// Like [`Config::load`], with command-line overrides applied after the
    /// environment and before validation
    pub fn load_with<F>(path: Option<&Path>, overrides: F) -> Result<Self>
    where
        F: FnOnce(&mut Self),
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Overlay values found through `lookup` onto this configuration
    ///
    /// Every unparsable value is collected and reported in a single error.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems = Vec::new();

        if let Some(env) = lookup("ENV") {
            self.environment = env;
        }

        let numbered: Vec<String> = (1..)
            .map_while(|i| lookup(&format!("{CANNON_URL_PREFIX}{i}")))
            .collect();
        if !numbered.is_empty() {
            self.fleet.cannon_urls = numbered;
        } else if let Some(list) = lookup("ENDOR_CANNON_URLS") {
            self.fleet.cannon_urls = list
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(String::from)
                .collect();
        }

        parse_into(
            &lookup,
            "ENDOR_MAX_CONCURRENT_CALLS",
            &mut self.fleet.max_concurrent_calls,
            &mut problems,
        );
        parse_into(
            &lookup,
            "ENDOR_STATUS_TIMEOUT_MS",
            &mut self.fleet.status_timeout_ms,
            &mut problems,
        );
        parse_into(
            &lookup,
            "ENDOR_FIRE_TIMEOUT_MS",
            &mut self.fleet.fire_timeout_ms,
            &mut problems,
        );
        parse_into(
            &lookup,
            "ENDOR_ROUND_TIMEOUT_MS",
            &mut self.fleet.round_timeout_ms,
            &mut problems,
        );
        parse_into(
            &lookup,
            "ENDOR_MAX_DISTANCE",
            &mut self.fleet.max_distance,
            &mut problems,
        );

        if let Some(bind) = lookup("ENDOR_BIND_ADDRESS") {
            self.server.bind_address = bind;
        }
        if let Some(level) = lookup("ENDOR_LOG_LEVEL") {
            self.logging.level = Some(level);
        }
        if let Some(format) = lookup("ENDOR_LOG_FORMAT") {
            self.logging.format = format;
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::config(problems.join("; ")))
        }
    }

    /// Validate configuration values
    ///
    /// All problems are reported together.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.fleet.cannon_urls.is_empty() {
            problems.push(format!(
                "missing required variable: {CANNON_URL_PREFIX}1 (or ENDOR_CANNON_URLS)"
            ));
        }

        for url in &self.fleet.cannon_urls {
            match url::Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                Ok(parsed) => problems.push(format!(
                    "cannon URL {url} has unsupported scheme {}",
                    parsed.scheme()
                )),
                Err(e) => problems.push(format!("invalid cannon URL {url}: {e}")),
            }
        }

        if self.fleet.max_concurrent_calls == 0 {
            problems.push("max_concurrent_calls must be greater than 0".to_string());
        }

        for (name, value) in [
            ("status_timeout_ms", self.fleet.status_timeout_ms),
            ("fire_timeout_ms", self.fleet.fire_timeout_ms),
            ("round_timeout_ms", self.fleet.round_timeout_ms),
            ("request_timeout_secs", self.server.request_timeout_secs),
        ] {
            if value == 0 {
                problems.push(format!("{name} must be greater than 0"));
            }
        }

        if !self.fleet.max_distance.is_finite() || self.fleet.max_distance < 0.0 {
            problems.push("max_distance must be a finite, non-negative number".to_string());
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            problems.push(format!(
                "log format must be text or json, got {}",
                self.logging.format
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::config(problems.join("; ")))
        }
    }

    /// Whether this is a development or test deployment
    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self.environment.as_str(), "dev" | "test")
    }

    /// Effective log level
    #[must_use]
    pub fn log_level(&self) -> &str {
        match &self.logging.level {
            Some(level) => level,
            None if self.is_development() => "debug",
            None => "warn",
        }
    }

    /// Fleet deadlines as durations
    #[must_use]
    pub fn fleet_config(&self) -> FleetConfig {
        FleetConfig {
            status_timeout: Duration::from_millis(self.fleet.status_timeout_ms),
            fire_timeout: Duration::from_millis(self.fleet.fire_timeout_ms),
            round_timeout: Duration::from_millis(self.fleet.round_timeout_ms),
        }
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

fn parse_into<F, T>(lookup: &F, key: &str, slot: &mut T, problems: &mut Vec<String>)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => problems.push(format!("{key} has invalid value {raw:?}")),
        }
    }
}

fn dotenv_loaded<T>(result: dotenvy::Result<T>) -> Result<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(Error::config(format!("failed to load .env file: {e}"))),
    }
}
