//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use endor::cannon::{CannonError, CannonResult, CannonStatus, FireOutcome, IonCannon};
use endor::fleet::{CallPool, FleetConfig};
use endor::models::{Coordinate, Enemy, EnemyType, Radar, Scan};
use endor::protocol::ProtocolType;
use endor::service::EndorService;

/// Tracks how many calls are running at once across a set of mock cannons
#[derive(Debug, Default)]
pub struct InFlight {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

/// A fire command as received by a mock cannon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireCall {
    pub x: u32,
    pub y: u32,
    pub enemies: u32,
}

/// In-memory ion cannon with scripted answers and call recording
pub struct MockCannon {
    name: String,
    generation: u32,
    available: bool,
    status_fails: bool,
    fire_fails: bool,
    casualties: Option<u32>,
    delay: Duration,
    status_calls: AtomicUsize,
    fire_calls: Mutex<Vec<FireCall>>,
    in_flight: Arc<InFlight>,
}

impl MockCannon {
    pub fn new(name: &str, generation: u32, available: bool) -> Self {
        Self {
            name: name.to_string(),
            generation,
            available,
            status_fails: false,
            fire_fails: false,
            casualties: None,
            delay: Duration::ZERO,
            status_calls: AtomicUsize::new(0),
            fire_calls: Mutex::new(Vec::new()),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn failing_status(mut self) -> Self {
        self.status_fails = true;
        self
    }

    pub fn failing_fire(mut self) -> Self {
        self.fire_fails = true;
        self
    }

    /// Casualties reported by the fire command; defaults to the enemy count
    pub fn with_casualties(mut self, casualties: u32) -> Self {
        self.casualties = Some(casualties);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn sharing(mut self, in_flight: Arc<InFlight>) -> Self {
        self.in_flight = in_flight;
        self
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn fire_calls(&self) -> Vec<FireCall> {
        self.fire_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IonCannon for MockCannon {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_status(&self) -> CannonResult<CannonStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.enter();
        tokio::time::sleep(self.delay).await;
        self.in_flight.exit();

        if self.status_fails {
            return Err(CannonError::HttpStatus { status: 500 });
        }

        Ok(CannonStatus {
            generation: self.generation,
            available: self.available,
        })
    }

    async fn fire_command(&self, x: u32, y: u32, enemies: u32) -> CannonResult<FireOutcome> {
        self.fire_calls
            .lock()
            .unwrap()
            .push(FireCall { x, y, enemies });
        self.in_flight.enter();
        tokio::time::sleep(self.delay).await;
        self.in_flight.exit();

        if self.fire_fails {
            return Err(CannonError::HttpStatus { status: 503 });
        }

        Ok(FireOutcome {
            casualties: self.casualties.unwrap_or(enemies),
            generation: self.generation,
        })
    }
}

/// Build a service over mock cannons with default deadlines
pub fn service_with(cannons: &[Arc<MockCannon>], capacity: usize) -> EndorService {
    service_with_config(cannons, capacity, FleetConfig::default())
}

pub fn service_with_config(
    cannons: &[Arc<MockCannon>],
    capacity: usize,
    config: FleetConfig,
) -> EndorService {
    let cannons = cannons
        .iter()
        .map(|c| Arc::clone(c) as Arc<dyn IonCannon>)
        .collect();
    EndorService::new(cannons, CallPool::new(capacity).unwrap(), config)
}

pub fn scan(x: u32, y: u32, kind: EnemyType, number: u32, allies: u32) -> Scan {
    Scan::new(Coordinate::new(x, y), Enemy::new(kind, number), allies)
}

pub fn radar(protocols: &[ProtocolType], scans: Vec<Scan>) -> Radar {
    Radar::new(protocols.to_vec(), scans)
}
