use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::error::JobError;
use crate::fetcher::TranscriptFetcher;
use crate::job::{FailureKind, JobFailure, Transcript};
use crate::manager::JobManager;

/// The single consumer of the job queue.
///
/// Fetches run outside the manager's lock and are written back through
/// `mark_job_completed`/`mark_job_failed`. A job that has started is never
/// cancelled; shutdown is only observed between jobs.
pub struct TranscriptionWorker {
	manager: Arc<JobManager>,
	fetcher: Arc<dyn TranscriptFetcher>,
	poll_interval: Duration,
	job_timeout: Duration,
}

impl TranscriptionWorker {
	pub fn new(manager: Arc<JobManager>, fetcher: Arc<dyn TranscriptFetcher>, config: &EngineConfig) -> Self {
		Self {
			manager,
			fetcher,
			poll_interval: config.poll_interval,
			job_timeout: config.job_timeout,
		}
	}

	/// Processes at most one job. Returns `false` when the queue was empty.
	pub async fn process_next(&self) -> bool {
		let Some(job) = self.manager.get_next_job().await else {
			return false;
		};

		let job_id = job.id();
		let started = Instant::now();
		info!(%job_id, priority = %job.priority(), url = %job.url(), "Processing job");

		let fetcher = Arc::clone(&self.fetcher);
		let url = job.url().to_string();
		let mut task = tokio::spawn(async move { fetcher.fetch(job_id, &url).await });

		let outcome: Result<Transcript, JobFailure> = tokio::select! {
			() = sleep(self.job_timeout) => {
				task.abort();
				Err(JobFailure::new(FailureKind::Timeout, format!("Transcription exceeded {}s", self.job_timeout.as_secs_f64())))
			}
			joined = &mut task => match joined {
				Ok(Ok(transcript)) => Ok(transcript),
				Ok(Err(e)) => Err(e.into()),
				Err(e) => Err(JobFailure::new(FailureKind::Internal, format!("Transcription task failed: {e}"))),
			}
		};

		let write_back = match outcome {
			Ok(transcript) => self.manager.mark_job_completed(&job_id, transcript).await,
			Err(failure) => {
				warn!(%job_id, kind = ?failure.kind, error = %failure.message, "Transcription failed");
				self.manager.mark_job_failed(&job_id, failure).await
			}
		};

		match write_back {
			Ok(job) => info!(%job_id, state = %job.state(), elapsed_ms = started.elapsed().as_millis(), "Finished job"),
			Err(e @ JobError::State { .. }) => error!(%job_id, error = %e, "Job left PROCESSING while the worker held it"),
			Err(e) => warn!(%job_id, error = %e, "Could not record job outcome"),
		}

		true
	}

	pub async fn run(&self, cancel: CancellationToken) {
		info!(poll_interval_ms = self.poll_interval.as_millis(), job_timeout_secs = self.job_timeout.as_secs(), "🎧 Transcription worker started");

		while !cancel.is_cancelled() {
			if self.process_next().await {
				continue;
			}

			tokio::select! {
				() = cancel.cancelled() => break,
				() = sleep(self.poll_interval) => {}
			}
		}

		info!("🛑 Transcription worker stopped");
	}

	pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
		tokio::spawn(async move { self.run(cancel).await })
	}
}
