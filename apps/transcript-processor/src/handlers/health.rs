use axum::{http::StatusCode, response::Json};
use serde::Serialize;
use tracing::instrument;

#[derive(Serialize)]
pub struct HealthResponse {
	status: &'static str,
	version: &'static str,
}

#[instrument(name = "alive")]
pub async fn alive() -> &'static str {
	"I am alive"
}

#[instrument(name = "health")]
pub async fn health() -> (StatusCode, Json<HealthResponse>) {
	let response = HealthResponse {
		status: "healthy",
		version: env!("CARGO_PKG_VERSION"),
	};

	(StatusCode::OK, Json(response))
}
