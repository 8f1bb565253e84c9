//! Fire command dispatch
//!
//! Firing is not reversible: the command goes to exactly one cannon, once.
//! A failure is reported to the caller and never retried or redirected.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{CallPool, FleetError};
use crate::cannon::{CannonError, FireOutcome, IonCannon};
use crate::metrics;
use crate::models::Coordinate;

/// Issues the fire command on a selected cannon
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pool: CallPool,
    fire_timeout: Duration,
}

impl Dispatcher {
    pub fn new(pool: CallPool, fire_timeout: Duration) -> Self {
        Self { pool, fire_timeout }
    }

    pub fn fire_timeout(&self) -> Duration {
        self.fire_timeout
    }

    /// Fire on `cannon` at `target`
    ///
    /// Cancellation is honoured only while waiting for a call slot. Once the
    /// command is sent it runs to completion or to the fire deadline.
    ///
    /// # Errors
    ///
    /// - [`FleetError::Cancelled`] if `cancel` fired before the command was sent
    /// - [`FleetError::FireCommandFailed`] if the call failed or timed out
    pub async fn fire(
        &self,
        cannon: &dyn IonCannon,
        target: &Coordinate,
        enemies: u32,
        cancel: &CancellationToken,
    ) -> Result<FireOutcome, FleetError> {
        let _permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(FleetError::Cancelled),
            permit = self.pool.acquire() => permit?,
        };

        tracing::debug!(
            cannon = cannon.name(),
            target_x = target.x(),
            target_y = target.y(),
            enemies,
            "Sending fire command"
        );

        let outcome = tokio::time::timeout(
            self.fire_timeout,
            cannon.fire_command(target.x(), target.y(), enemies),
        )
        .await
        .unwrap_or(Err(CannonError::Timeout(self.fire_timeout)));

        match outcome {
            Ok(outcome) => {
                metrics::record_fire_command("success");
                tracing::info!(
                    cannon = cannon.name(),
                    casualties = outcome.casualties,
                    generation = outcome.generation,
                    "Fire command completed"
                );
                Ok(outcome)
            }
            Err(source) => {
                metrics::record_fire_command("failed");
                tracing::error!(cannon = cannon.name(), error = %source, "Failed to fire command");
                Err(FleetError::FireCommandFailed {
                    cannon: cannon.name().to_string(),
                    source,
                })
            }
        }
    }
}
