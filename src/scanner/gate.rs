//! Admission control for connect attempts.
//!
//! A [`ConcurrencyGate`] caps how many attempts are in flight at once. Each
//! scan gets its own gate (or shares one explicitly), so independent scans
//! in the same process never borrow each other's capacity by accident.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// A counting gate of fixed capacity.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `capacity` holders. A capacity of
    /// zero is raised to one so the gate can never deadlock a scan, and
    /// anything above [`Semaphore::MAX_PERMITS`] is lowered to it.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently held.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of permits ever held at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Wait for a slot. The slot is released when the returned permit is
    /// dropped, whatever path the holder takes.
    pub async fn acquire(&self) -> Result<GatePermit, AcquireError> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        tracing::trace!(in_flight = now, capacity = self.capacity, "slot acquired");

        Ok(GatePermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }
}

/// A held slot in a [`ConcurrencyGate`].
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        // Runs before the semaphore permit is returned, so `in_flight` can
        // never read above capacity.
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
