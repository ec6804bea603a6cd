use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use crate::error::{JobError, Result};

/// Prometheus counters for the job lifecycle. Each manager owns its own registry.
#[derive(Clone)]
pub struct JobMetrics {
	registry: Registry,
	pub created: IntCounter,
	pub completed: IntCounter,
	pub failed: IntCounter,
	pub expired: IntCounter,
	pub stalled: IntCounter,
	pub queue_depth: IntGauge,
}

impl JobMetrics {
	pub fn new() -> Result<Self> {
		let registry = Registry::new();

		let created = IntCounter::new("transcript_jobs_created_total", "Total jobs created")?;
		let completed = IntCounter::new("transcript_jobs_completed_total", "Total jobs completed")?;
		let failed = IntCounter::new("transcript_jobs_failed_total", "Total jobs failed")?;
		let expired = IntCounter::new("transcript_jobs_expired_total", "Total terminal jobs evicted after retention")?;
		let stalled = IntCounter::new("transcript_jobs_stalled_total", "Total processing jobs reclaimed by the stall sweep")?;
		let queue_depth = IntGauge::new("transcript_jobs_queue_depth", "Jobs waiting in the priority queue")?;

		registry.register(Box::new(created.clone()))?;
		registry.register(Box::new(completed.clone()))?;
		registry.register(Box::new(failed.clone()))?;
		registry.register(Box::new(expired.clone()))?;
		registry.register(Box::new(stalled.clone()))?;
		registry.register(Box::new(queue_depth.clone()))?;

		Ok(Self {
			registry,
			created,
			completed,
			failed,
			expired,
			stalled,
			queue_depth,
		})
	}

	/// Renders every registered metric in the text exposition format.
	pub fn render(&self) -> Result<String> {
		let mut buffer = Vec::new();
		TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
		String::from_utf8(buffer).map_err(|e| JobError::Parse(format!("metrics output is not UTF-8: {e}")))
	}

	pub(crate) fn set_queue_depth(&self, depth: usize) {
		self.queue_depth.set(i64::try_from(depth).unwrap_or(i64::MAX));
	}
}
