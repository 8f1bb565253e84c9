//! Prometheus metrics for the endor service
//!
//! This module tracks:
//! - Attacks by outcome
//! - Status queries and fire commands by outcome
//! - Status round duration and cannon calls in flight
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Encoder, Gauge,
    Histogram, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all service metrics
struct EndorMetrics {
    attacks: CounterVec,
    status_queries: CounterVec,
    fire_commands: CounterVec,
    status_round_duration: Histogram,
    calls_in_flight: Gauge,
}

/// Global storage for service metrics
static METRICS: OnceLock<EndorMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, subsequent metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = endor::metrics::init_metrics() {
///     tracing::warn!("Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = EndorMetrics {
        attacks: register_counter_vec!(
            "endor_attacks_total",
            "Total attack requests by outcome",
            &["outcome"]
        )?,
        status_queries: register_counter_vec!(
            "endor_status_queries_total",
            "Total cannon status queries by outcome",
            &["outcome"]
        )?,
        fire_commands: register_counter_vec!(
            "endor_fire_commands_total",
            "Total fire commands by outcome",
            &["outcome"]
        )?,
        status_round_duration: register_histogram!(
            "endor_status_round_duration_seconds",
            "Duration of a full cannon status round in seconds",
            vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0]
        )?,
        calls_in_flight: register_gauge!(
            "endor_cannon_calls_in_flight",
            "Number of cannon calls currently holding a pool slot"
        )?,
    };

    METRICS
        .set(metrics)
        .map_err(|_| "Endor metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record an attack outcome (`success` or an error kind)
pub fn record_attack(outcome: &str) {
    if let Some(m) = METRICS.get() {
        m.attacks.with_label_values(&[outcome]).inc();
    }
}

/// Record a status query outcome (`available`, `unavailable`, `failed`)
pub fn record_status_query(outcome: &str) {
    if let Some(m) = METRICS.get() {
        m.status_queries.with_label_values(&[outcome]).inc();
    }
}

/// Record a fire command outcome (`success`, `failed`)
pub fn record_fire_command(outcome: &str) {
    if let Some(m) = METRICS.get() {
        m.fire_commands.with_label_values(&[outcome]).inc();
    }
}

/// Record how long a status round took
pub fn observe_status_round(duration_secs: f64) {
    if let Some(m) = METRICS.get() {
        m.status_round_duration.observe(duration_secs);
    }
}

/// Update the in-flight call gauge
pub fn set_calls_in_flight(count: usize) {
    if let Some(m) = METRICS.get() {
        m.calls_in_flight.set(count as f64);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_is_safe_before_init() {
        // Must not panic whether or not another test initialized the registry
        record_attack("success");
        record_status_query("failed");
        record_fire_command("success");
        observe_status_round(0.01);
        set_calls_in_flight(3);
    }

    #[test]
    fn test_init_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
        assert!(metrics_initialized());

        record_attack("empty_target_set");
        let text = encode_metrics().unwrap();
        assert!(text.contains("endor_attacks_total"));
    }
}
