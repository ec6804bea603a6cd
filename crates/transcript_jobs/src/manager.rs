use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cleanup::CleanupStats;
use crate::config::EngineConfig;
use crate::error::{JobError, Result};
use crate::job::{validate_url, FailureKind, Job, JobFailure, JobId, JobState, Priority, Transcript};
use crate::metrics::JobMetrics;
use crate::priority_queue::{JobQueue, QueueEntry};

/// Per-URL result of a batch submission.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionOutcome {
	Accepted { job: Job },
	Rejected { url: String, error: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
	pub pending: usize,
	pub processing: usize,
	pub completed: usize,
	pub failed: usize,
	pub queued: usize,
}

struct ManagerState {
	jobs: HashMap<JobId, Job>,
	queue: JobQueue,
	queued: HashSet<JobId>,
	next_seq: u64,
}

impl ManagerState {
	fn insert_job(&mut self, url: Url, priority: Priority, now: DateTime<Utc>) -> Job {
		let mut id = JobId::new();
		while self.jobs.contains_key(&id) {
			id = JobId::new();
		}

		let job = Job::new(id, url, priority, self.next_seq, now);
		self.next_seq += 1;
		self.jobs.insert(id, job.clone());
		job
	}

	fn enqueue(&mut self, job_id: &JobId) -> Result<()> {
		let job = self.jobs.get(job_id).ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

		if job.state() != JobState::Pending {
			return Err(JobError::Queue(format!("job {job_id} is {}, only PENDING jobs can be queued", job.state())));
		}
		if self.queued.contains(job_id) {
			return Err(JobError::Queue(format!("job {job_id} is already queued")));
		}

		self.queue.push(QueueEntry::for_job(job))?;
		self.queued.insert(*job_id);
		Ok(())
	}

	fn job_mut(&mut self, job_id: &JobId) -> Result<&mut Job> {
		self.jobs.get_mut(job_id).ok_or_else(|| JobError::NotFound(job_id.to_string()))
	}

	/// Evicts terminal jobs finished before `cutoff`. Returns (completed, failed) counts.
	fn expire_before(&mut self, cutoff: DateTime<Utc>) -> (usize, usize) {
		let mut completed = 0;
		let mut failed = 0;

		self.jobs.retain(|_, job| {
			let finished_at = job.completed_at().unwrap_or_else(|| job.updated_at());
			let expired = job.state().is_terminal() && finished_at < cutoff;
			if expired {
				if job.state() == JobState::Completed {
					completed += 1;
				} else {
					failed += 1;
				}
			}
			!expired
		});

		(completed, failed)
	}

	fn fail_stalled_before(&mut self, cutoff: DateTime<Utc>, now: DateTime<Utc>, timeout: Duration) -> usize {
		let mut reclaimed = 0;

		for job in self.jobs.values_mut() {
			let stalled = job.state() == JobState::Processing && job.started_at().is_some_and(|started| started < cutoff);
			if !stalled {
				continue;
			}

			let failure = JobFailure::new(FailureKind::Stalled, format!("Job exceeded processing timeout of {}s", timeout.as_secs()));
			if job.fail(failure, now).is_ok() {
				warn!(job_id = %job.id(), "Reclaimed job stuck in PROCESSING");
				reclaimed += 1;
			}
		}

		reclaimed
	}
}

fn cutoff(now: DateTime<Utc>, window: Duration) -> Option<DateTime<Utc>> {
	chrono::Duration::from_std(window).ok().and_then(|window| now.checked_sub_signed(window))
}

/// Sole owner of job records and the priority queue.
///
/// Every operation takes the lock for its critical section only; nothing awaits
/// external work while holding it. Callers receive snapshots, never references
/// into the index.
pub struct JobManager {
	state: Mutex<ManagerState>,
	metrics: JobMetrics,
}

impl JobManager {
	pub fn new(max_queue_size: usize) -> Result<Self> {
		let metrics = JobMetrics::new()?;
		info!(max_queue_size, "Initialized job manager");

		Ok(Self {
			state: Mutex::new(ManagerState {
				jobs: HashMap::new(),
				queue: JobQueue::new(max_queue_size),
				queued: HashSet::new(),
				next_seq: 0,
			}),
			metrics,
		})
	}

	pub fn from_config(config: &EngineConfig) -> Result<Self> {
		Self::new(config.max_queue_size)
	}

	#[must_use]
	pub const fn metrics(&self) -> &JobMetrics {
		&self.metrics
	}

	/// Validates `url` and records a new PENDING job. Does not enqueue it.
	pub async fn create_job(&self, url: &str, priority: Priority) -> Result<Job> {
		let url = validate_url(url)?;

		let mut guard = self.state.lock().await;
		let job = guard.insert_job(url, priority, Utc::now());
		self.metrics.created.inc();

		info!(job_id = %job.id(), %priority, "Created job");
		Ok(job)
	}

	pub async fn queue_job(&self, job_id: &JobId) -> Result<()> {
		let mut guard = self.state.lock().await;
		guard.enqueue(job_id)?;
		self.metrics.set_queue_depth(guard.queue.len());

		debug!(%job_id, queue_depth = guard.queue.len(), "Queued job");
		Ok(())
	}

	/// Creates and enqueues in one critical section; nothing is recorded if admission fails.
	pub async fn submit(&self, url: &str, priority: Priority) -> Result<Job> {
		let url = validate_url(url)?;

		let mut guard = self.state.lock().await;
		let state = &mut *guard;
		let job = state.insert_job(url, priority, Utc::now());
		if let Err(e) = state.enqueue(&job.id()) {
			state.jobs.remove(&job.id());
			return Err(e);
		}

		self.metrics.created.inc();
		self.metrics.set_queue_depth(state.queue.len());
		info!(job_id = %job.id(), %priority, "Submitted job");
		Ok(job)
	}

	pub async fn submit_batch(&self, urls: &[String], priority: Priority) -> Vec<SubmissionOutcome> {
		info!(count = urls.len(), %priority, "Submitting URLs for transcription");
		let mut outcomes = Vec::with_capacity(urls.len());

		for url in urls {
			match self.submit(url, priority).await {
				Ok(job) => outcomes.push(SubmissionOutcome::Accepted { job }),
				Err(e) => {
					warn!(%url, error = %e, "Rejected submission");
					outcomes.push(SubmissionOutcome::Rejected {
						url: url.clone(),
						error: e.to_string(),
					});
				}
			}
		}

		outcomes
	}

	/// Pops the most urgent entry and moves its job to PROCESSING.
	///
	/// `None` means the queue is empty; it is not an error.
	pub async fn get_next_job(&self) -> Option<Job> {
		let mut guard = self.state.lock().await;
		let state = &mut *guard;
		let now = Utc::now();

		while let Some(entry) = state.queue.pop() {
			state.queued.remove(&entry.job_id);

			let Some(job) = state.jobs.get_mut(&entry.job_id) else {
				warn!(job_id = %entry.job_id, "Dropping queue entry for unknown job");
				continue;
			};

			match job.start(now) {
				Ok(()) => {
					self.metrics.set_queue_depth(state.queue.len());
					debug!(job_id = %job.id(), priority = %job.priority(), "Dequeued job");
					return Some(job.clone());
				}
				Err(e) => warn!(error = %e, "Dropping queue entry for job that is no longer pending"),
			}
		}

		None
	}

	pub async fn mark_job_completed(&self, job_id: &JobId, transcript: Transcript) -> Result<Job> {
		let mut guard = self.state.lock().await;
		let job = guard.job_mut(job_id)?;
		job.complete(transcript, Utc::now())?;
		self.metrics.completed.inc();

		info!(%job_id, "Job completed");
		Ok(job.clone())
	}

	pub async fn mark_job_failed(&self, job_id: &JobId, failure: JobFailure) -> Result<Job> {
		let mut guard = self.state.lock().await;
		let job = guard.job_mut(job_id)?;
		job.fail(failure, Utc::now())?;
		self.metrics.failed.inc();

		info!(%job_id, kind = ?job.error().map(|f| f.kind), "Job failed");
		Ok(job.clone())
	}

	pub async fn get_job(&self, job_id: &JobId) -> Result<Job> {
		let guard = self.state.lock().await;
		guard.jobs.get(job_id).cloned().ok_or_else(|| JobError::NotFound(job_id.to_string()))
	}

	/// Snapshots ordered by submission time, optionally restricted to one state.
	pub async fn get_all_jobs(&self, filter: Option<JobState>) -> Vec<Job> {
		let guard = self.state.lock().await;
		let mut jobs: Vec<Job> = guard.jobs.values().filter(|job| filter.map_or(true, |state| job.state() == state)).cloned().collect();
		drop(guard);

		jobs.sort_by_key(|job| (job.submitted_at(), job.seq()));
		jobs
	}

	pub async fn counts(&self) -> JobCounts {
		let guard = self.state.lock().await;
		let mut counts = JobCounts {
			queued: guard.queue.len(),
			..JobCounts::default()
		};

		for job in guard.jobs.values() {
			match job.state() {
				JobState::Pending => counts.pending += 1,
				JobState::Processing => counts.processing += 1,
				JobState::Completed => counts.completed += 1,
				JobState::Failed => counts.failed += 1,
			}
		}

		counts
	}

	/// Evicts COMPLETED/FAILED jobs that finished more than `retention` ago.
	pub async fn cleanup_expired_jobs(&self, retention: Duration) -> usize {
		self.cleanup_expired_jobs_at(retention, Utc::now()).await
	}

	/// Same as [`Self::cleanup_expired_jobs`], measured against an explicit clock.
	pub async fn cleanup_expired_jobs_at(&self, retention: Duration, now: DateTime<Utc>) -> usize {
		let Some(cutoff) = cutoff(now, retention) else {
			return 0;
		};

		let mut guard = self.state.lock().await;
		let (completed, failed) = guard.expire_before(cutoff);
		let removed = completed + failed;
		self.metrics.expired.inc_by(removed as u64);

		if removed > 0 {
			info!(removed, remaining = guard.jobs.len(), "Evicted expired jobs");
		}
		removed
	}

	/// Fails PROCESSING jobs that started more than `processing_timeout` ago.
	pub async fn fail_stalled_jobs(&self, processing_timeout: Duration) -> usize {
		self.fail_stalled_jobs_at(processing_timeout, Utc::now()).await
	}

	pub async fn fail_stalled_jobs_at(&self, processing_timeout: Duration, now: DateTime<Utc>) -> usize {
		let Some(cutoff) = cutoff(now, processing_timeout) else {
			return 0;
		};

		let mut guard = self.state.lock().await;
		let reclaimed = guard.fail_stalled_before(cutoff, now, processing_timeout);
		self.metrics.stalled.inc_by(reclaimed as u64);
		self.metrics.failed.inc_by(reclaimed as u64);
		reclaimed
	}

	/// Runs the stall sweep then the expiry sweep under a single lock.
	pub async fn force_cleanup(&self, retention: Duration, processing_timeout: Duration) -> CleanupStats {
		self.force_cleanup_at(retention, processing_timeout, Utc::now()).await
	}

	pub async fn force_cleanup_at(&self, retention: Duration, processing_timeout: Duration, now: DateTime<Utc>) -> CleanupStats {
		let mut guard = self.state.lock().await;
		let initial_job_count = guard.jobs.len();

		let processing_timed_out = cutoff(now, processing_timeout).map_or(0, |cutoff| guard.fail_stalled_before(cutoff, now, processing_timeout));
		let (stale_completed_removed, stale_failed_removed) = cutoff(now, retention).map_or((0, 0), |cutoff| guard.expire_before(cutoff));

		self.metrics.stalled.inc_by(processing_timed_out as u64);
		self.metrics.failed.inc_by(processing_timed_out as u64);
		self.metrics.expired.inc_by((stale_completed_removed + stale_failed_removed) as u64);

		let stats = CleanupStats {
			initial_job_count,
			final_job_count: guard.jobs.len(),
			stale_completed_removed,
			stale_failed_removed,
			processing_timed_out,
		};
		info!(?stats, "Cleanup completed");
		stats
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const URL: &str = "https://example.com/audio/meeting-789.m4a";

	fn manager() -> JobManager {
		JobManager::new(16).unwrap()
	}

	fn transcript(job: &Job) -> Transcript {
		Transcript {
			job_id: job.id(),
			url: job.url().to_string(),
			duration_secs: 60.0,
			text: "Chairperson: good morning".to_string(),
			speakers: Vec::new(),
			language: "en".to_string(),
		}
	}

	async fn processing_job(manager: &JobManager) -> Job {
		let job = manager.submit(URL, Priority::Medium).await.unwrap();
		let next = manager.get_next_job().await.unwrap();
		assert_eq!(next.id(), job.id());
		next
	}

	#[tokio::test]
	async fn test_create_job_does_not_enqueue() {
		let manager = manager();
		let job = manager.create_job(URL, Priority::High).await.unwrap();

		assert_eq!(job.state(), JobState::Pending);
		assert!(manager.get_next_job().await.is_none());
		assert_eq!(manager.get_job(&job.id()).await.unwrap().state(), JobState::Pending);
	}

	#[tokio::test]
	async fn test_create_job_rejects_malformed_url() {
		let manager = manager();
		let err = manager.create_job("definitely not a url", Priority::Low).await.unwrap_err();
		assert!(matches!(err, JobError::Validation(_)));
		assert!(manager.get_all_jobs(None).await.is_empty());
	}

	#[tokio::test]
	async fn test_queue_job_rejects_unknown_duplicate_and_non_pending() {
		let manager = manager();
		let job = manager.create_job(URL, Priority::Medium).await.unwrap();

		assert!(matches!(manager.queue_job(&JobId::new()).await, Err(JobError::NotFound(_))));

		manager.queue_job(&job.id()).await.unwrap();
		assert!(matches!(manager.queue_job(&job.id()).await, Err(JobError::Queue(_))));

		manager.get_next_job().await.unwrap();
		assert!(matches!(manager.queue_job(&job.id()).await, Err(JobError::Queue(_))));
	}

	#[tokio::test]
	async fn test_scenario_low_high_medium() {
		let manager = manager();
		let a = manager.submit(URL, Priority::Low).await.unwrap();
		let b = manager.submit(URL, Priority::High).await.unwrap();
		let c = manager.submit(URL, Priority::Medium).await.unwrap();

		assert_eq!(manager.get_next_job().await.unwrap().id(), b.id());
		assert_eq!(manager.get_next_job().await.unwrap().id(), c.id());
		assert_eq!(manager.get_next_job().await.unwrap().id(), a.id());
		assert!(manager.get_next_job().await.is_none());
	}

	#[tokio::test]
	async fn test_get_next_job_on_empty_queue_changes_nothing() {
		let manager = manager();
		let job = manager.create_job(URL, Priority::Medium).await.unwrap();
		let before = manager.get_all_jobs(None).await;

		assert!(manager.get_next_job().await.is_none());
		assert_eq!(manager.get_all_jobs(None).await, before);
		assert_eq!(manager.get_job(&job.id()).await.unwrap().state(), JobState::Pending);
	}

	#[tokio::test]
	async fn test_submit_rolls_back_when_queue_is_full() {
		let manager = JobManager::new(1).unwrap();
		manager.submit(URL, Priority::Low).await.unwrap();

		let err = manager.submit(URL, Priority::High).await.unwrap_err();
		assert!(matches!(err, JobError::Queue(_)));
		assert_eq!(manager.get_all_jobs(None).await.len(), 1);
	}

	#[tokio::test]
	async fn test_complete_and_fail_guard_state() {
		let manager = manager();
		let pending = manager.create_job(URL, Priority::Medium).await.unwrap();

		let err = manager.mark_job_completed(&pending.id(), transcript(&pending)).await.unwrap_err();
		assert!(matches!(err, JobError::State { .. }));
		let err = manager.mark_job_failed(&pending.id(), JobFailure::new(FailureKind::Upstream, "x")).await.unwrap_err();
		assert!(matches!(err, JobError::State { .. }));
		assert_eq!(manager.get_job(&pending.id()).await.unwrap(), pending);

		let job = processing_job(&manager).await;
		let completed = manager.mark_job_completed(&job.id(), transcript(&job)).await.unwrap();
		assert_eq!(completed.state(), JobState::Completed);

		let err = manager.mark_job_failed(&job.id(), JobFailure::new(FailureKind::Timeout, "late")).await.unwrap_err();
		assert!(matches!(err, JobError::State { state: JobState::Completed, .. }));
		assert_eq!(manager.get_job(&job.id()).await.unwrap(), completed);
	}

	#[tokio::test]
	async fn test_mark_unknown_job_is_not_found() {
		let manager = manager();
		let err = manager.mark_job_failed(&JobId::new(), JobFailure::new(FailureKind::Internal, "x")).await.unwrap_err();
		assert!(matches!(err, JobError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_get_all_jobs_ordered_and_filtered() {
		let manager = manager();
		let first = manager.submit(URL, Priority::Low).await.unwrap();
		let second = manager.submit(URL, Priority::High).await.unwrap();
		let third = manager.create_job(URL, Priority::Medium).await.unwrap();

		let ids: Vec<_> = manager.get_all_jobs(None).await.iter().map(Job::id).collect();
		assert_eq!(ids, vec![first.id(), second.id(), third.id()]);

		manager.get_next_job().await.unwrap();
		let processing = manager.get_all_jobs(Some(JobState::Processing)).await;
		assert_eq!(processing.len(), 1);
		assert_eq!(processing[0].id(), second.id());
	}

	#[tokio::test]
	async fn test_cleanup_only_removes_old_terminal_jobs() {
		let manager = manager();
		let done = processing_job(&manager).await;
		manager.mark_job_completed(&done.id(), transcript(&done)).await.unwrap();
		let failed = processing_job(&manager).await;
		manager.mark_job_failed(&failed.id(), JobFailure::new(FailureKind::Upstream, "502")).await.unwrap();
		let in_flight = processing_job(&manager).await;
		let pending = manager.create_job(URL, Priority::Low).await.unwrap();

		let retention = Duration::from_secs(3600);
		assert_eq!(manager.cleanup_expired_jobs(retention).await, 0);

		let later = Utc::now() + chrono::Duration::hours(2);
		assert_eq!(manager.cleanup_expired_jobs_at(retention, later).await, 2);

		assert!(matches!(manager.get_job(&done.id()).await, Err(JobError::NotFound(_))));
		assert!(matches!(manager.get_job(&failed.id()).await, Err(JobError::NotFound(_))));
		assert_eq!(manager.get_job(&in_flight.id()).await.unwrap().state(), JobState::Processing);
		assert_eq!(manager.get_job(&pending.id()).await.unwrap().state(), JobState::Pending);
		assert_eq!(manager.metrics().expired.get(), 2);
	}

	#[tokio::test]
	async fn test_stalled_jobs_are_failed_not_dropped() {
		let manager = manager();
		let job = processing_job(&manager).await;
		let timeout = Duration::from_secs(1800);

		assert_eq!(manager.fail_stalled_jobs(timeout).await, 0);

		let later = Utc::now() + chrono::Duration::hours(1);
		assert_eq!(manager.fail_stalled_jobs_at(timeout, later).await, 1);

		let reclaimed = manager.get_job(&job.id()).await.unwrap();
		assert_eq!(reclaimed.state(), JobState::Failed);
		assert_eq!(reclaimed.error().map(|f| f.kind), Some(FailureKind::Stalled));

		let err = manager.mark_job_completed(&job.id(), transcript(&job)).await.unwrap_err();
		assert!(matches!(err, JobError::State { .. }));
	}

	#[tokio::test]
	async fn test_force_cleanup_reports_stats() {
		let manager = manager();
		let done = processing_job(&manager).await;
		manager.mark_job_completed(&done.id(), transcript(&done)).await.unwrap();
		processing_job(&manager).await;
		manager.create_job(URL, Priority::Low).await.unwrap();

		let later = Utc::now() + chrono::Duration::hours(2);
		let stats = manager.force_cleanup_at(Duration::from_secs(3600), Duration::from_secs(1800), later).await;

		assert_eq!(
			stats,
			CleanupStats {
				initial_job_count: 3,
				final_job_count: 2,
				stale_completed_removed: 1,
				stale_failed_removed: 0,
				processing_timed_out: 1,
			}
		);
	}

	#[tokio::test]
	async fn test_submit_batch_keeps_good_urls() {
		let manager = manager();
		let urls = vec![URL.to_string(), "ftp://example.com/a.mp3".to_string()];
		let outcomes = manager.submit_batch(&urls, Priority::High).await;

		assert!(matches!(outcomes[0], SubmissionOutcome::Accepted { .. }));
		assert!(matches!(&outcomes[1], SubmissionOutcome::Rejected { url, .. } if url == "ftp://example.com/a.mp3"));
		assert_eq!(manager.counts().await.queued, 1);
	}
}
