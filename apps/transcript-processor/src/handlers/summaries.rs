use axum::extract::{Path, State};
use axum::Json;
use tracing::instrument;
use transcript_jobs::{Summary, VerificationResponse};

use super::jobs::parse_job_id;
use crate::{ApiError, AppState};

#[instrument(name = "summarize", skip(state))]
pub async fn summarize(State(state): State<AppState>, Path(job_id): Path<String>) -> Result<Json<Summary>, ApiError> {
	let job_id = parse_job_id(&job_id)?;
	let summary = state.summarizer.summarize(&state.manager, &job_id).await?;
	Ok(Json(summary))
}

#[instrument(name = "verify", skip(state, summary), fields(transcript_id = %summary.transcript_id))]
pub async fn verify(State(state): State<AppState>, Json(summary): Json<Summary>) -> Result<Json<VerificationResponse>, ApiError> {
	Ok(Json(state.summarizer.verify_summary(&summary).await?))
}
