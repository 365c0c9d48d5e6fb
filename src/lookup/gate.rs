use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

use crate::error::ConfigError;

/// Counting semaphore bounding the number of lookups in flight.
///
/// A [`GatePermit`] frees its slot when dropped, so a worker releases the
/// gate on every exit path, including panics.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

pub type GatePermit = OwnedSemaphorePermit;

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::Zero("max_concurrent"));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Wait until fewer than `capacity` lookups are in flight.
    ///
    /// Only fails if the gate was closed.
    pub async fn acquire(&self) -> Result<GatePermit, AcquireError> {
        Arc::clone(&self.semaphore).acquire_owned().await
    }

    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}
