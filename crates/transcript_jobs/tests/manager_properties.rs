// tests/manager_properties.rs
// Ordering, exactly-once, and cleanup properties of the job manager under concurrency

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use transcript_jobs::{FailureKind, JobError, JobFailure, JobManager, JobState, Priority, Transcript};

// ============================================================================
// Helpers
// ============================================================================

const PRODUCERS: usize = 8;
const JOBS_PER_PRODUCER: usize = 50;

fn url(n: usize) -> String {
	format!("https://example.com/audio/episode-{n}.mp3")
}

fn priority_for(n: usize) -> Priority {
	match n % 3 {
		0 => Priority::High,
		1 => Priority::Medium,
		_ => Priority::Low,
	}
}

fn transcript_for(job: &transcript_jobs::Job) -> Transcript {
	transcript_jobs::fixtures::transcript_for(job.id(), job.url())
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn dequeue_order_respects_priority_then_submission() {
	let manager = JobManager::new(1000).unwrap();
	for n in 0..60 {
		manager.submit(&url(n), priority_for(n * 7)).await.unwrap();
	}

	let mut drained = Vec::new();
	while let Some(job) = manager.get_next_job().await {
		drained.push(job);
	}

	assert_eq!(drained.len(), 60);
	for pair in drained.windows(2) {
		let (a, b) = (&pair[0], &pair[1]);
		assert!(a.priority().rank() <= b.priority().rank());
		if a.priority() == b.priority() {
			assert!(a.submitted_at() <= b.submitted_at());
		}
	}
}

#[tokio::test]
async fn create_then_queue_separately_keeps_order() {
	let manager = JobManager::new(10).unwrap();
	let low = manager.create_job(&url(1), Priority::Low).await.unwrap();
	let high = manager.create_job(&url(2), Priority::High).await.unwrap();

	manager.queue_job(&low.id()).await.unwrap();
	manager.queue_job(&high.id()).await.unwrap();

	assert_eq!(manager.get_next_job().await.unwrap().id(), high.id());
	assert_eq!(manager.get_next_job().await.unwrap().id(), low.id());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_single_consumer_dequeue_each_job_once() {
	let manager = Arc::new(JobManager::new(PRODUCERS * JOBS_PER_PRODUCER).unwrap());

	let producers: Vec<_> = (0..PRODUCERS)
		.map(|p| {
			let manager = Arc::clone(&manager);
			tokio::spawn(async move {
				let mut ids = Vec::with_capacity(JOBS_PER_PRODUCER);
				for i in 0..JOBS_PER_PRODUCER {
					let n = p * JOBS_PER_PRODUCER + i;
					ids.push(manager.submit(&url(n), priority_for(n)).await.unwrap().id());
				}
				ids
			})
		})
		.collect();

	let consumer = {
		let manager = Arc::clone(&manager);
		tokio::spawn(async move {
			let mut seen = Vec::new();
			while seen.len() < PRODUCERS * JOBS_PER_PRODUCER {
				match manager.get_next_job().await {
					Some(job) => {
						assert_eq!(job.state(), JobState::Processing);
						let transcript = transcript_for(&job);
						manager.mark_job_completed(&job.id(), transcript).await.unwrap();
						seen.push(job.id());
					}
					None => tokio::task::yield_now().await,
				}
			}
			seen
		})
	};

	let mut submitted = HashSet::new();
	for producer in producers {
		submitted.extend(producer.await.unwrap());
	}

	let seen = tokio::time::timeout(Duration::from_secs(30), consumer).await.unwrap().unwrap();
	let unique: HashSet<_> = seen.iter().copied().collect();

	assert_eq!(unique.len(), seen.len(), "a job was dequeued twice");
	assert_eq!(unique, submitted, "a job was lost");
	assert!(manager.get_next_job().await.is_none());
	assert_eq!(manager.get_all_jobs(Some(JobState::Completed)).await.len(), submitted.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_consumers_never_share_a_job() {
	const CONSUMERS: usize = 4;
	const TOTAL: usize = PRODUCERS * JOBS_PER_PRODUCER;

	let manager = Arc::new(JobManager::new(TOTAL).unwrap());
	let taken = Arc::new(AtomicUsize::new(0));

	let consumers: Vec<_> = (0..CONSUMERS)
		.map(|_| {
			let manager = Arc::clone(&manager);
			let taken = Arc::clone(&taken);
			tokio::spawn(async move {
				let mut seen = Vec::new();
				while taken.load(Ordering::SeqCst) < TOTAL {
					match manager.get_next_job().await {
						Some(job) => {
							taken.fetch_add(1, Ordering::SeqCst);
							let transcript = transcript_for(&job);
							manager.mark_job_completed(&job.id(), transcript).await.unwrap();
							seen.push(job.id());
						}
						None => tokio::task::yield_now().await,
					}
				}
				seen
			})
		})
		.collect();

	let producers: Vec<_> = (0..PRODUCERS)
		.map(|p| {
			let manager = Arc::clone(&manager);
			tokio::spawn(async move {
				let mut ids = Vec::with_capacity(JOBS_PER_PRODUCER);
				for i in 0..JOBS_PER_PRODUCER {
					let n = p * JOBS_PER_PRODUCER + i;
					ids.push(manager.submit(&url(n), priority_for(n)).await.unwrap().id());
				}
				ids
			})
		})
		.collect();

	let mut submitted = HashSet::new();
	for producer in producers {
		submitted.extend(producer.await.unwrap());
	}

	let mut seen = Vec::new();
	for consumer in consumers {
		seen.extend(tokio::time::timeout(Duration::from_secs(30), consumer).await.unwrap().unwrap());
	}
	let unique: HashSet<_> = seen.iter().copied().collect();

	assert_eq!(seen.len(), TOTAL);
	assert_eq!(unique.len(), seen.len(), "two consumers received the same job");
	assert_eq!(unique, submitted, "a job was lost");
	assert!(manager.get_next_job().await.is_none());
	assert_eq!(manager.get_all_jobs(Some(JobState::Completed)).await.len(), TOTAL);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_see_consistent_snapshots_while_worker_runs() {
	let manager = Arc::new(JobManager::new(200).unwrap());
	for n in 0..100 {
		manager.submit(&url(n), Priority::Medium).await.unwrap();
	}

	let worker = {
		let manager = Arc::clone(&manager);
		tokio::spawn(async move {
			while let Some(job) = manager.get_next_job().await {
				manager.mark_job_failed(&job.id(), JobFailure::new(FailureKind::Upstream, "503")).await.unwrap();
			}
		})
	};

	for _ in 0..20 {
		for job in manager.get_all_jobs(None).await {
			match job.state() {
				JobState::Completed => panic!("no job should complete"),
				JobState::Failed => assert!(job.error().is_some() && job.result().is_none()),
				JobState::Pending | JobState::Processing => assert!(job.error().is_none()),
			}
		}
		tokio::task::yield_now().await;
	}

	worker.await.unwrap();
	assert_eq!(manager.counts().await.failed, 100);
}

// ============================================================================
// State guards and cleanup
// ============================================================================

#[tokio::test]
async fn illegal_transition_leaves_job_unchanged() {
	let manager = JobManager::new(10).unwrap();
	let job = manager.submit(&url(1), Priority::High).await.unwrap();
	let before = manager.get_job(&job.id()).await.unwrap();

	let err = manager.mark_job_completed(&job.id(), transcript_for(&job)).await.unwrap_err();
	assert!(matches!(err, JobError::State { state: JobState::Pending, .. }));
	assert_eq!(manager.get_job(&job.id()).await.unwrap(), before);
}

#[tokio::test]
async fn cleanup_never_touches_live_jobs() {
	let manager = JobManager::new(10).unwrap();
	let pending = manager.submit(&url(1), Priority::Low).await.unwrap();
	let in_flight = manager.submit(&url(2), Priority::High).await.unwrap();
	manager.get_next_job().await.unwrap();

	let far_future = chrono::Utc::now() + chrono::Duration::days(30);
	assert_eq!(manager.cleanup_expired_jobs_at(Duration::from_secs(1), far_future).await, 0);

	assert_eq!(manager.get_job(&pending.id()).await.unwrap().state(), JobState::Pending);
	assert_eq!(manager.get_job(&in_flight.id()).await.unwrap().state(), JobState::Processing);
	assert_eq!(manager.get_next_job().await.unwrap().id(), pending.id());
}

#[tokio::test]
async fn zero_retention_still_requires_strictly_older_jobs() {
	let manager = JobManager::new(10).unwrap();
	manager.submit(&url(1), Priority::Medium).await.unwrap();
	let job = manager.get_next_job().await.unwrap();
	let done = manager.mark_job_completed(&job.id(), transcript_for(&job)).await.unwrap();

	let completed_at = done.completed_at().unwrap();
	assert_eq!(manager.cleanup_expired_jobs_at(Duration::ZERO, completed_at).await, 0);
	assert_eq!(manager.cleanup_expired_jobs_at(Duration::ZERO, completed_at + chrono::Duration::milliseconds(1)).await, 1);
}
