use axum::{extract::State, http::header::CONTENT_TYPE, response::IntoResponse};
use prometheus::TEXT_FORMAT;

use crate::{ApiError, AppState};

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
	let body = state.manager.metrics().render()?;
	Ok(([(CONTENT_TYPE, TEXT_FORMAT)], body))
}
