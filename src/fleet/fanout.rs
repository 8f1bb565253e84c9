//! Concurrent status round and cannon selection

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{CallPool, FleetConfig, FleetError};
use crate::cannon::{CannonError, CannonResult, CannonStatus, IonCannon};
use crate::metrics;

// ============================================================================
// Round Results
// ============================================================================

/// Outcome of one cannon's status query
#[derive(Debug)]
pub struct StatusReport {
    /// Position of the cannon in the configured list
    pub index: usize,

    /// Cannon name
    pub cannon: String,

    /// Status, or the error that excluded the cannon
    pub outcome: CannonResult<CannonStatus>,
}

impl StatusReport {
    /// Generation of the cannon if it answered and is available
    pub fn available_generation(&self) -> Option<u32> {
        match &self.outcome {
            Ok(status) if status.available => Some(status.generation),
            _ => None,
        }
    }
}

/// The cannon picked by a status round
#[derive(Clone)]
pub struct Selection {
    pub index: usize,
    pub cannon: Arc<dyn IonCannon>,
    pub status: CannonStatus,
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("index", &self.index)
            .field("cannon", &self.cannon.name())
            .field("status", &self.status)
            .finish()
    }
}

/// Pick the available cannon with the strictly lowest generation
///
/// Ties go to the earliest report, so with reports in configured order the
/// earliest configured cannon wins. Returns the position in `reports`.
pub fn select_best(reports: &[StatusReport]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;

    for (position, report) in reports.iter().enumerate() {
        let Some(generation) = report.available_generation() else {
            continue;
        };

        if best.map_or(true, |(_, lowest)| generation < lowest) {
            best = Some((position, generation));
        }
    }

    best.map(|(position, _)| position)
}

// ============================================================================
// Fan-Out Coordinator
// ============================================================================

/// Queries every cannon concurrently and selects the best available one
///
/// The cannon list, pool and deadlines are fixed at construction.
pub struct FanOutCoordinator {
    cannons: Vec<Arc<dyn IonCannon>>,
    pool: CallPool,
    config: FleetConfig,
}

impl FanOutCoordinator {
    pub fn new(cannons: Vec<Arc<dyn IonCannon>>, pool: CallPool, config: FleetConfig) -> Self {
        Self {
            cannons,
            pool,
            config,
        }
    }

    pub fn cannons(&self) -> &[Arc<dyn IonCannon>] {
        &self.cannons
    }

    pub fn pool(&self) -> &CallPool {
        &self.pool
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Run one status round and return every cannon's outcome in configured order
    ///
    /// Waits until every query has resolved. When the round deadline passes,
    /// pending queries are cancelled and resolve as failures.
    pub async fn survey(&self, cancel: &CancellationToken) -> Vec<StatusReport> {
        let round = cancel.child_token();
        let started = Instant::now();

        let queries = join_all(
            self.cannons
                .iter()
                .enumerate()
                .map(|(index, cannon)| self.query(index, cannon.as_ref(), &round)),
        );
        tokio::pin!(queries);

        let deadline = tokio::time::sleep(self.config.round_timeout);
        tokio::pin!(deadline);

        let reports = loop {
            tokio::select! {
                reports = &mut queries => break reports,
                () = &mut deadline, if !round.is_cancelled() => {
                    tracing::warn!(
                        timeout = ?self.config.round_timeout,
                        "Status round deadline reached, cancelling pending queries"
                    );
                    round.cancel();
                }
            }
        };

        metrics::observe_status_round(started.elapsed().as_secs_f64());
        reports
    }

    /// Run a status round and select the cannon to fire
    ///
    /// # Errors
    ///
    /// - [`FleetError::Cancelled`] if `cancel` fired during the round
    /// - [`FleetError::NoBackendAvailable`] if no cannon is available
    pub async fn select(&self, cancel: &CancellationToken) -> Result<Selection, FleetError> {
        let reports = self.survey(cancel).await;

        if cancel.is_cancelled() {
            return Err(FleetError::Cancelled);
        }

        let selected = select_best(&reports).and_then(|position| {
            let report = &reports[position];
            report.outcome.as_ref().ok().map(|status| (report, *status))
        });

        let Some((report, status)) = selected else {
            let failed = reports.iter().filter(|r| r.outcome.is_err()).count();
            tracing::warn!(
                queried = reports.len(),
                failed,
                "No ion cannon available"
            );
            return Err(FleetError::NoBackendAvailable {
                queried: reports.len(),
                failed,
            });
        };

        tracing::info!(
            cannon = %report.cannon,
            generation = status.generation,
            "Selected ion cannon"
        );

        Ok(Selection {
            index: report.index,
            cannon: Arc::clone(&self.cannons[report.index]),
            status,
        })
    }

    async fn query(
        &self,
        index: usize,
        cannon: &dyn IonCannon,
        round: &CancellationToken,
    ) -> StatusReport {
        let outcome = tokio::select! {
            biased;
            () = round.cancelled() => Err(CannonError::Cancelled),
            outcome = self.check_status(cannon) => outcome,
        };

        match &outcome {
            Ok(status) => {
                tracing::debug!(
                    cannon = cannon.name(),
                    generation = status.generation,
                    available = status.available,
                    "Cannon status received"
                );
                metrics::record_status_query(if status.available { "available" } else { "unavailable" });
            }
            Err(e) => {
                tracing::warn!(cannon = cannon.name(), error = %e, "Backend query failed, excluding cannon");
                metrics::record_status_query("failed");
            }
        }

        StatusReport {
            index,
            cannon: cannon.name().to_string(),
            outcome,
        }
    }

    async fn check_status(&self, cannon: &dyn IonCannon) -> CannonResult<CannonStatus> {
        let _permit = self
            .pool
            .acquire()
            .await
            .map_err(|e| CannonError::Other(e.to_string()))?;

        tokio::time::timeout(self.config.status_timeout, cannon.check_status())
            .await
            .unwrap_or(Err(CannonError::Timeout(self.config.status_timeout)))
    }
}

// ============================================================================
// Tests
// ============================================================================
