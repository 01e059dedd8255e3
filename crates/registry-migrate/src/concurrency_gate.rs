//! The process-wide bounded admission gate for concurrent imports.

use std::sync::Arc;

use tokio::sync::{Semaphore, TryAcquireError};

use registry_core::MetricsSink;

/// A held admission slot. Releasing happens exactly once, on drop, so every
/// code path that acquired a slot — success, failure, or early return —
/// releases it without needing to remember to call anything explicit.
pub struct GateSlot {
	_permit: tokio::sync::OwnedSemaphorePermit,
}

/// A counting semaphore of capacity `max_concurrent_imports`. `capacity = 0`
/// disables imports entirely: every `try_acquire` fails.
pub struct ConcurrencyGate {
	semaphore: Arc<Semaphore>,
	capacity: u32,
	metrics: Arc<dyn MetricsSink>,
}

impl ConcurrencyGate {
	pub fn new(capacity: u32, metrics: Arc<dyn MetricsSink>) -> Self {
		metrics.set_gate_remaining(capacity);
		Self {
			semaphore: Arc::new(Semaphore::new(capacity as usize)),
			capacity,
			metrics,
		}
	}

	/// Attempts to admit one more import without blocking. Returns `None`
	/// if the gate is full; the caller must reply `429` and must not have
	/// mutated any state before calling this.
	pub fn try_acquire(&self) -> Option<GateSlot> {
		match Arc::clone(&self.semaphore).try_acquire_owned() {
			Ok(permit) => {
				self.metrics.set_gate_remaining(self.remaining());
				Some(GateSlot { _permit: permit })
			}
			Err(TryAcquireError::NoPermits) => None,
			Err(TryAcquireError::Closed) => None,
		}
	}

	/// Remaining capacity, for the gauge metric.
	pub fn remaining(&self) -> u32 {
		self.semaphore.available_permits() as u32
	}

	pub fn capacity(&self) -> u32 {
		self.capacity
	}
}
