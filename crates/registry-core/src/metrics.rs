//! The gauge surface observability hooks into; see `SPEC_FULL.md` §4.9.

use crate::migration_status::MigrationStatus;

/// A metrics registry capable of recording the gauges the migration
/// subsystem exposes. The spec does not mandate a wire format, so this
/// trait is implemented once in-memory (for tests) and once against a real
/// collector by the embedding application.
pub trait MetricsSink: Send + Sync {
	/// Remaining capacity on the concurrency gate.
	fn set_gate_remaining(&self, remaining: u32);

	/// Number of repositories currently in `status`.
	fn set_status_count(&self, status: MigrationStatus, count: u64);
}

/// A [`MetricsSink`] that discards every observation; the default when no
/// collector is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
	fn set_gate_remaining(&self, _remaining: u32) {}

	fn set_status_count(&self, _status: MigrationStatus, _count: u64) {}
}
