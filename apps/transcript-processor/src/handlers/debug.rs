use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::{info, instrument};
use transcript_jobs::{CleanupStats, Job, Priority};

use crate::{ApiError, AppState};

pub const TEST_JOB_URL: &str = "https://example.com/test-audio.mp3";

#[derive(Debug, Deserialize)]
pub struct TestJobQuery {
	#[serde(default)]
	pub priority: Priority,
}

#[instrument(name = "force_cleanup", skip(state))]
pub async fn force_cleanup(State(state): State<AppState>) -> Json<CleanupStats> {
	let stats = state.manager.force_cleanup(state.engine.retention, state.engine.processing_timeout).await;
	Json(stats)
}

#[instrument(name = "create_test_job", skip(state))]
pub async fn create_test_job(State(state): State<AppState>, Query(query): Query<TestJobQuery>) -> Result<Json<Job>, ApiError> {
	let job = state.manager.submit(TEST_JOB_URL, query.priority).await?;
	info!(job_id = %job.id(), "Created test job");
	Ok(Json(job))
}
