use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::manager::JobManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
	pub initial_job_count: usize,
	pub final_job_count: usize,
	pub stale_completed_removed: usize,
	pub stale_failed_removed: usize,
	pub processing_timed_out: usize,
}

impl CleanupStats {
	#[must_use]
	pub const fn removed(&self) -> usize {
		self.stale_completed_removed + self.stale_failed_removed
	}
}

/// Runs the stall and expiry sweeps every `interval` until `cancel` fires.
///
/// The first tick is skipped so a freshly started process does not sweep immediately.
pub fn spawn_cleanup_task(manager: Arc<JobManager>, interval: Duration, retention: Duration, processing_timeout: Duration, cancel: CancellationToken) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		ticker.tick().await;

		info!(interval_secs = interval.as_secs(), retention_secs = retention.as_secs(), "Cleanup task started");

		loop {
			tokio::select! {
				() = cancel.cancelled() => {
					info!("Cleanup task shutting down");
					break;
				}
				_ = ticker.tick() => {
					let stats = manager.force_cleanup(retention, processing_timeout).await;
					debug!(removed = stats.removed(), reclaimed = stats.processing_timed_out, "Periodic cleanup finished");
				}
			}
		}
	})
}
