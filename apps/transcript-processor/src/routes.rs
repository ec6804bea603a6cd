use axum::error_handling::HandleErrorLayer;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower::{timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{debug, health, jobs, metrics, summaries};
use crate::{ApiError, AppState};

async fn handle_tower_error(error: BoxError) -> ApiError {
	if error.is::<tower::timeout::error::Elapsed>() {
		tracing::warn!("Request timeout: {}", error);
		ApiError::RequestTimeout
	} else {
		tracing::error!("Unhandled tower error: {}", error);
		ApiError::TowerError(error)
	}
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
	let app = Router::new()
		.route("/", get(health::alive))
		.route("/health", get(health::health))
		.route("/metrics", get(metrics::metrics))
		.route("/v1/transcribe", post(jobs::transcribe))
		.route("/v1/jobs", get(jobs::list_jobs))
		.route("/v1/jobs/:job_id", get(jobs::get_job))
		.route("/v1/summarize/:job_id", post(summaries::summarize))
		.route("/v1/verify", post(summaries::verify))
		.route("/v1/debug/force-cleanup", post(debug::force_cleanup))
		.route("/v1/debug/create-test-job", post(debug::create_test_job))
		.with_state(state);

	app.layer(
		ServiceBuilder::new()
			.layer(TraceLayer::new_for_http())
			.layer(CorsLayer::permissive())
			.layer(HandleErrorLayer::new(|error: BoxError| async move { handle_tower_error(error).await }))
			.layer(TimeoutLayer::new(request_timeout)),
	)
}
