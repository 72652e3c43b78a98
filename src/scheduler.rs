//! # Scheduler Module
//!
//! Worker pool che limita il numero di conversioni in esecuzione. Usato sia
//! per le liste di file in batch mode che per la sotto-codifica parallela dei
//! chunk in split mode.
//!
//! L'acquisizione di uno slot blocca il dispatcher finché uno slot non si
//! libera; il rilascio avviene sempre, su ogni percorso di uscita, perché il
//! permit è owned e viene rilasciato al drop.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded-concurrency executor slot pool
#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Acquire a running slot, waiting until one frees.
    ///
    /// The permit releases its slot when dropped, so a job can never leak
    /// capacity regardless of how it terminates.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Ok(self.semaphore.clone().acquire_owned().await?)
    }
}
