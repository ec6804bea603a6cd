use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use transcript_jobs::{FetchError, FetchErrorKind, GenerationError, GenerationErrorKind, JobError};

pub const RATE_LIMIT_RETRY_AFTER_SECS: &str = "60";

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
	#[error(transparent)]
	Job(#[from] JobError),

	#[error("Request timeout")]
	RequestTimeout,

	#[error("Unexpected Tower Service error: {0}")]
	TowerError(#[from] tower::BoxError),
}

#[derive(Serialize)]
struct ErrorBody {
	detail: String,
}

impl ApiError {
	pub const fn status_code(&self) -> StatusCode {
		match self {
			Self::Job(error) => match error {
				JobError::Validation(_) => StatusCode::BAD_REQUEST,
				JobError::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
				JobError::NotFound(_) => StatusCode::NOT_FOUND,
				JobError::State { .. } => StatusCode::CONFLICT,
				JobError::Fetch(FetchError { kind, .. }) => match kind {
					FetchErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
					FetchErrorKind::InvalidUrl | FetchErrorKind::FileTooLarge => StatusCode::BAD_REQUEST,
					FetchErrorKind::Upstream => StatusCode::BAD_GATEWAY,
				},
				JobError::Generation(GenerationError { kind, .. }) => match kind {
					GenerationErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
					GenerationErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
					GenerationErrorKind::TokenLimit => StatusCode::BAD_REQUEST,
					GenerationErrorKind::Connection | GenerationErrorKind::Upstream => StatusCode::BAD_GATEWAY,
				},
				JobError::Parse(_) => StatusCode::BAD_GATEWAY,
				JobError::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
			},
			Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
			Self::TowerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		if status.is_server_error() {
			tracing::error!(status = status.as_u16(), error = %self, "Request failed");
		} else {
			tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
		}

		let body = Json(ErrorBody { detail: self.to_string() });
		match status {
			StatusCode::TOO_MANY_REQUESTS => (status, [(RETRY_AFTER, HeaderValue::from_static(RATE_LIMIT_RETRY_AFTER_SECS))], body).into_response(),
			_ => (status, body).into_response(),
		}
	}
}
