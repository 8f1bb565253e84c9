//! Endor HTTP server implementation

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::service::EndorService;

use super::api::{attack_routes, query_routes};
use super::config::ServerConfig;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Attack orchestrator
    pub service: Arc<EndorService>,

    /// Server start time
    pub start_time: Instant,

    /// Configuration
    pub config: ServerConfig,
}

// ============================================================================
// Endor Server
// ============================================================================

/// HTTP front of the attack service
pub struct EndorServer {
    config: ServerConfig,
    state: AppState,
}

impl EndorServer {
    /// Create a new server around a configured service
    pub fn new(config: ServerConfig, service: Arc<EndorService>) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let state = AppState {
            service,
            start_time: Instant::now(),
            config: config.clone(),
        };

        Ok(Self { config, state })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    ///
    /// The request timeout covers the read-only routes only. `/attack` is
    /// bounded by the fleet deadlines instead, so a client never sees a
    /// timeout for a fire command that was still sent.
    pub fn build_router(&self) -> Router {
        let queries = query_routes(self.state.clone())
            .layer(TimeoutLayer::new(self.config.request_timeout()));
        let mut router = attack_routes(self.state.clone()).merge(queries);

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http().make_span_with(request_span));
        }

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Start the server
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Start with graceful shutdown
    ///
    /// Returns once `shutdown_signal` resolves and in-flight requests drain.
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        tracing::info!(
            %addr,
            cannons = self.state.service.cannon_count(),
            "Starting endor server"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        tracing::info!("Endor server shutdown complete");
        Ok(())
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.bind_address,
            cannons: self.state.service.cannon_count(),
            max_concurrent_calls: self.state.service.pool().capacity(),
            cors_enabled: self.config.enable_cors,
            request_logging_enabled: self.config.enable_request_logging,
        }
    }
}

/// Request header carrying the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id
    )
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub cannons: usize,
    pub max_concurrent_calls: usize,
    pub cors_enabled: bool,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Endor Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Ion Cannons: {}\n\
             Max Concurrent Calls: {}\n\
             CORS: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            self.cannons,
            self.max_concurrent_calls,
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.request_logging_enabled {
                "enabled"
            } else {
                "disabled"
            }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone)]
pub enum ServerError {
    /// Configuration error
    ConfigError(String),

    /// Failed to bind to address
    BindError(String),

    /// Server error
    ServeError(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::BindError(msg) => write!(f, "Failed to bind: {}", msg),
            Self::ServeError(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{CallPool, FleetConfig};

    fn service() -> Arc<EndorService> {
        Arc::new(EndorService::new(
            Vec::new(),
            CallPool::new(8).unwrap(),
            FleetConfig::default(),
        ))
    }

    #[test]
    fn test_server_info() {
        let server = EndorServer::new(ServerConfig::default(), service()).unwrap();
        let info = server.info();

        assert_eq!(info.cannons, 0);
        assert_eq!(info.max_concurrent_calls, 8);
        assert!(info.cors_enabled);
        assert!(info.display().contains("Max Concurrent Calls: 8"));
    }

    #[test]
    fn test_server_with_custom_config() {
        let config = ServerConfig::builder()
            .enable_cors(false)
            .enable_request_logging(false)
            .build()
            .unwrap();

        let server = EndorServer::new(config, service()).unwrap();
        assert!(!server.info().cors_enabled);
        assert!(!server.info().request_logging_enabled);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ServerConfig {
            request_timeout_secs: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            EndorServer::new(config, service()),
            Err(ServerError::ConfigError(_))
        ));
    }
}
