//! Attack orchestration
//!
//! An attack runs strictly in sequence:
//!
//! ```text
//! pipeline ─▶ target ─▶ status round ─▶ selection ─▶ fire ─▶ report
//! ```
//!
//! Any failure ends the attack immediately with no partial report.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::cannon::{IonCannon, IonCannonClient, IonCannonClientConfig};
use crate::config::Config;
use crate::error::{EndorErrorTrait, Result};
use crate::fleet::{CallPool, Dispatcher, FanOutCoordinator, FleetConfig, StatusReport};
use crate::metrics;
use crate::models::{AttackReport, Radar};
use crate::protocol::{Pipeline, DEFAULT_MAX_DISTANCE};

/// Selects a target and fires the best available cannon at it
pub struct EndorService {
    coordinator: FanOutCoordinator,
    dispatcher: Dispatcher,
    max_distance: f64,
}

impl EndorService {
    /// Create a service over a fixed cannon list
    ///
    /// `pool` caps cannon calls for the whole process and is shared by the
    /// status round and the fire command.
    pub fn new(cannons: Vec<Arc<dyn IonCannon>>, pool: CallPool, config: FleetConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(pool.clone(), config.fire_timeout),
            coordinator: FanOutCoordinator::new(cannons, pool, config),
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }

    /// Override the range limit applied ahead of every pipeline
    pub fn with_max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Build HTTP cannon clients and the call pool from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let fleet = config.fleet_config();
        fleet.validate()?;
        let cannons = config
            .fleet
            .cannon_urls
            .iter()
            .enumerate()
            .map(|(i, url)| -> Result<Arc<dyn IonCannon>> {
                let client = IonCannonClient::new(
                    IonCannonClientConfig::new(url)
                        .with_name(format!("cannon-{}", i + 1))
                        .with_timeout(fleet.status_timeout.max(fleet.fire_timeout)),
                )?;
                Ok(Arc::new(client) as Arc<dyn IonCannon>)
            })
            .collect::<Result<Vec<_>>>()?;

        let pool = CallPool::new(config.fleet.max_concurrent_calls)?;

        tracing::info!(
            cannons = cannons.len(),
            max_concurrent_calls = pool.capacity(),
            max_distance = config.fleet.max_distance,
            "Endor service configured"
        );

        Ok(Self::new(cannons, pool, fleet).with_max_distance(config.fleet.max_distance))
    }

    pub fn cannon_count(&self) -> usize {
        self.coordinator.cannons().len()
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    pub fn pool(&self) -> &CallPool {
        self.coordinator.pool()
    }

    /// Run one attack with no external cancellation
    pub async fn attack(&self, radar: &Radar) -> Result<AttackReport> {
        self.attack_with_cancel(radar, &CancellationToken::new()).await
    }

    /// Run one attack
    ///
    /// # Errors
    ///
    /// - [`crate::error::Error::EmptyTargetSet`] when the pipeline leaves no scan
    /// - `Error::Fleet(NoBackendAvailable)` when no cannon is available
    /// - `Error::Fleet(FireCommandFailed)` when the fire call fails
    /// - `Error::Fleet(Cancelled)` when `cancel` fires before the command is sent
    pub async fn attack_with_cancel(
        &self,
        radar: &Radar,
        cancel: &CancellationToken,
    ) -> Result<AttackReport> {
        let span = tracing::info_span!(
            "attack",
            attack_id = %Uuid::new_v4(),
            protocols = radar.protocols.len(),
            scans = radar.scan.len()
        );

        let result = self.run_attack(radar, cancel).instrument(span).await;

        match &result {
            Ok(_) => metrics::record_attack("success"),
            Err(e) => metrics::record_attack(e.kind()),
        }

        result
    }

    async fn run_attack(&self, radar: &Radar, cancel: &CancellationToken) -> Result<AttackReport> {
        let pipeline = Pipeline::with_max_distance(self.max_distance, &radar.protocols);
        let target = pipeline.select_target(&radar.scan).inspect_err(|_| {
            tracing::info!("No valid target after applying protocols");
        })?;

        tracing::debug!(
            target_x = target.coordinates.x(),
            target_y = target.coordinates.y(),
            enemies = target.enemies.number,
            "Target selected"
        );

        let selection = self.coordinator.select(cancel).await?;

        let outcome = self
            .dispatcher
            .fire(
                selection.cannon.as_ref(),
                &target.coordinates,
                target.enemies.number,
                cancel,
            )
            .await?;

        Ok(AttackReport {
            target: target.coordinates,
            casualties: outcome.casualties,
            generation: outcome.generation,
        })
    }

    /// Run one status round without firing
    pub async fn fleet_status(&self) -> Vec<StatusReport> {
        self.coordinator.survey(&CancellationToken::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cannon::{CannonError, CannonResult, CannonStatus, FireOutcome};
    use crate::error::Error;
    use crate::fleet::FleetError;
    use crate::models::{Coordinate, Enemy, EnemyType, Scan};
    use crate::protocol::ProtocolType;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestCannon {
        name: &'static str,
        status: CannonResult<CannonStatus>,
        fire_fails: bool,
        fired: AtomicUsize,
    }

    #[async_trait]
    impl IonCannon for TestCannon {
        fn name(&self) -> &str {
            self.name
        }

        async fn check_status(&self) -> CannonResult<CannonStatus> {
            match &self.status {
                Ok(status) => Ok(*status),
                Err(_) => Err(CannonError::Other("down".to_string())),
            }
        }

        async fn fire_command(&self, _x: u32, _y: u32, enemies: u32) -> CannonResult<FireOutcome> {
            self.fired.fetch_add(1, Ordering::SeqCst);
            if self.fire_fails {
                return Err(CannonError::HttpStatus { status: 500 });
            }
            let generation = self.status.as_ref().map(|s| s.generation).unwrap_or(0);
            Ok(FireOutcome {
                casualties: enemies,
                generation,
            })
        }
    }

    fn cannon(name: &'static str, available: bool, generation: u32) -> Arc<TestCannon> {
        Arc::new(TestCannon {
            name,
            status: Ok(CannonStatus {
                generation,
                available,
            }),
            fire_fails: false,
            fired: AtomicUsize::new(0),
        })
    }

    fn service(cannons: &[Arc<TestCannon>]) -> EndorService {
        let cannons = cannons
            .iter()
            .map(|c| Arc::clone(c) as Arc<dyn IonCannon>)
            .collect();
        EndorService::new(cannons, CallPool::new(4).unwrap(), FleetConfig::default())
    }

    fn radar(protocols: Vec<ProtocolType>, scans: Vec<(u32, u32, EnemyType, u32)>) -> Radar {
        Radar::new(
            protocols,
            scans
                .into_iter()
                .map(|(x, y, kind, number)| {
                    Scan::new(Coordinate::new(x, y), Enemy::new(kind, number), 0)
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_attack_fires_lowest_generation() {
        let first = cannon("first", true, 1);
        let second = cannon("second", true, 2);
        let service = service(&[first.clone(), second.clone()]);

        let report = service
            .attack(&radar(
                vec![ProtocolType::ClosestEnemies],
                vec![(10, 20, EnemyType::Soldier, 5)],
            ))
            .await
            .unwrap();

        assert_eq!(report.target, Coordinate::new(10, 20));
        assert_eq!(report.casualties, 5);
        assert_eq!(report.generation, 1);
        assert_eq!(first.fired.load(Ordering::SeqCst), 1);
        assert_eq!(second.fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_target_set_skips_fleet() {
        let only = cannon("only", true, 1);
        let service = service(&[only.clone()]);

        let err = service
            .attack(&radar(vec![], vec![(200, 0, EnemyType::Soldier, 5)]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EmptyTargetSet));
        assert_eq!(only.fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_cannon_available() {
        let service = service(&[cannon("a", false, 1), cannon("b", false, 2)]);

        let err = service
            .attack(&radar(vec![], vec![(1, 1, EnemyType::Mech, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Fleet(FleetError::NoBackendAvailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_fire_failure_does_not_fall_back() {
        let broken = Arc::new(TestCannon {
            name: "broken",
            status: Ok(CannonStatus {
                generation: 0,
                available: true,
            }),
            fire_fails: true,
            fired: AtomicUsize::new(0),
        });
        let backup = cannon("backup", true, 5);
        let service = service(&[broken.clone(), backup.clone()]);

        let err = service
            .attack(&radar(vec![], vec![(1, 1, EnemyType::Soldier, 3)]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "fire_command_failed");
        assert_eq!(broken.fired.load(Ordering::SeqCst), 1);
        assert_eq!(backup.fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_custom_max_distance() {
        let service = service(&[cannon("a", true, 1)]).with_max_distance(5.0);
        assert_eq!(service.max_distance(), 5.0);

        let err = service
            .attack(&radar(vec![], vec![(6, 8, EnemyType::Soldier, 3)]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyTargetSet));
    }
}
