use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use transcript_jobs::{Job, JobError, JobId, JobState, Priority, SubmissionOutcome};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
	pub urls: Vec<String>,
	#[serde(default)]
	pub priority: Priority,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
	pub jobs: Vec<SubmissionOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
	pub status: Option<JobState>,
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
	pub jobs: Vec<Job>,
}

/// Parses a path segment as a job id. Malformed ids cannot exist, so they are reported as missing.
pub fn parse_job_id(raw: &str) -> Result<JobId, ApiError> {
	raw.parse().map_err(|_| JobError::NotFound(raw.to_string()).into())
}

#[instrument(name = "transcribe", skip(state, request), fields(count = request.urls.len(), priority = %request.priority))]
pub async fn transcribe(State(state): State<AppState>, Json(request): Json<TranscribeRequest>) -> Result<(StatusCode, Json<TranscribeResponse>), ApiError> {
	if request.urls.is_empty() {
		return Err(JobError::Validation("urls must contain at least one URL".to_string()).into());
	}

	let jobs = state.manager.submit_batch(&request.urls, request.priority).await;
	Ok((StatusCode::ACCEPTED, Json(TranscribeResponse { jobs })))
}

#[instrument(name = "list_jobs", skip(state))]
pub async fn list_jobs(State(state): State<AppState>, Query(query): Query<JobsQuery>) -> Json<JobsResponse> {
	let jobs = state.manager.get_all_jobs(query.status).await;
	Json(JobsResponse { jobs })
}

#[instrument(name = "get_job", skip(state))]
pub async fn get_job(State(state): State<AppState>, Path(job_id): Path<String>) -> Result<Json<Job>, ApiError> {
	let job_id = parse_job_id(&job_id)?;
	Ok(Json(state.manager.get_job(&job_id).await?))
}
