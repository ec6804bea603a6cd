use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::job::{JobId, JobState};

#[derive(Error, Debug)]
pub enum JobError {
	#[error("Validation error: {0}")]
	Validation(String),
	#[error("Queue error: {0}")]
	Queue(String),
	#[error("Job {0} not found")]
	NotFound(String),
	#[error("Cannot {action} job {job_id} in state {state}")]
	State { job_id: JobId, state: JobState, action: &'static str },
	#[error("Fetch error: {0}")]
	Fetch(#[from] FetchError),
	#[error("Generation error: {0}")]
	Generation(#[from] GenerationError),
	#[error("Parse error: {0}")]
	Parse(String),
	#[error("Prometheus error: {0}")]
	Metrics(#[from] prometheus::Error),
}

impl From<serde_json::Error> for JobError {
	fn from(error: serde_json::Error) -> Self {
		Self::Parse(error.to_string())
	}
}

pub type Result<T> = std::result::Result<T, JobError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchErrorKind {
	InvalidUrl,
	Timeout,
	Upstream,
	FileTooLarge,
}

impl FetchErrorKind {
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::InvalidUrl => "INVALID_URL",
			Self::Timeout => "TIMEOUT",
			Self::Upstream => "UPSTREAM_ERROR",
			Self::FileTooLarge => "FILE_TOO_LARGE",
		}
	}
}

impl fmt::Display for FetchErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Failure reported by the transcript fetch collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct FetchError {
	pub kind: FetchErrorKind,
	pub message: String,
}

impl FetchError {
	pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
		Self { kind, message: message.into() }
	}

	pub fn invalid_url(message: impl Into<String>) -> Self {
		Self::new(FetchErrorKind::InvalidUrl, message)
	}

	pub fn timeout(message: impl Into<String>) -> Self {
		Self::new(FetchErrorKind::Timeout, message)
	}

	pub fn upstream(message: impl Into<String>) -> Self {
		Self::new(FetchErrorKind::Upstream, message)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationErrorKind {
	Timeout,
	RateLimit,
	Connection,
	TokenLimit,
	Upstream,
}

impl GenerationErrorKind {
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Timeout => "TIMEOUT",
			Self::RateLimit => "RATE_LIMIT",
			Self::Connection => "CONNECTION_ERROR",
			Self::TokenLimit => "TOKEN_LIMIT",
			Self::Upstream => "UPSTREAM_ERROR",
		}
	}
}

impl fmt::Display for GenerationErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Failure reported by the text-generation collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct GenerationError {
	pub kind: GenerationErrorKind,
	pub message: String,
}

impl GenerationError {
	pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
		Self { kind, message: message.into() }
	}
}
