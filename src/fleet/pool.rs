//! Bounded pool of outbound cannon call slots
//!
//! One `CallPool` is created per process and handed to every component that
//! calls cannons. Clones share the same capacity, so two concurrent attacks
//! compete for the same slots.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::FleetError;
use crate::metrics;

/// Counting semaphore capping simultaneous cannon calls
#[derive(Debug, Clone)]
pub struct CallPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl CallPool {
    /// Create a pool with `capacity` slots
    pub fn new(capacity: usize) -> Result<Self, FleetError> {
        if capacity == 0 || capacity > Semaphore::MAX_PERMITS {
            return Err(FleetError::InvalidCapacity);
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held
    pub fn in_flight(&self) -> usize {
        self.capacity - self.available()
    }

    /// Wait for a free slot
    ///
    /// The slot is returned when the permit is dropped, on every path.
    pub async fn acquire(&self) -> Result<CallPermit, FleetError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| FleetError::PoolClosed)?;

        metrics::set_calls_in_flight(self.in_flight());

        Ok(CallPermit {
            permit: Some(permit),
            pool: self.clone(),
        })
    }

    /// Stop handing out slots; pending and future acquires fail
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// A held call slot
#[derive(Debug)]
pub struct CallPermit {
    permit: Option<OwnedSemaphorePermit>,
    pool: CallPool,
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        drop(self.permit.take());
        metrics::set_calls_in_flight(self.pool.in_flight());
    }
}
