use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{FetchError, FetchErrorKind, JobError, Result};

pub const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];
pub const SUPPORTED_FORMATS: [&str; 5] = [".mp3", ".wav", ".m4a", ".mp4", ".webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}

	#[must_use]
	pub const fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl Default for JobId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for JobId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl FromStr for JobId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Uuid::parse_str(s).map(Self)
	}
}

/// Dequeue tier. Lower rank is served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
	High,
	#[default]
	Medium,
	Low,
}

impl Priority {
	#[must_use]
	pub const fn rank(self) -> u8 {
		match self {
			Self::High => 1,
			Self::Medium => 2,
			Self::Low => 3,
		}
	}
}

impl fmt::Display for Priority {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::High => f.write_str("HIGH"),
			Self::Medium => f.write_str("MEDIUM"),
			Self::Low => f.write_str("LOW"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
	Pending,
	Processing,
	Completed,
	Failed,
}

impl JobState {
	#[must_use]
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Completed | Self::Failed)
	}
}

impl fmt::Display for JobState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Pending => f.write_str("PENDING"),
			Self::Processing => f.write_str("PROCESSING"),
			Self::Completed => f.write_str("COMPLETED"),
			Self::Failed => f.write_str("FAILED"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
	pub id: String,
	pub name: Option<String>,
	pub speaking_time_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
	pub job_id: JobId,
	pub url: String,
	pub duration_secs: f64,
	pub text: String,
	pub speakers: Vec<Speaker>,
	pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
	InvalidUrl,
	Timeout,
	Upstream,
	FileTooLarge,
	/// Reclaimed by the cleanup sweep after sitting in PROCESSING too long.
	Stalled,
	/// The fetch task panicked or was aborted.
	Internal,
}

impl From<FetchErrorKind> for FailureKind {
	fn from(kind: FetchErrorKind) -> Self {
		match kind {
			FetchErrorKind::InvalidUrl => Self::InvalidUrl,
			FetchErrorKind::Timeout => Self::Timeout,
			FetchErrorKind::Upstream => Self::Upstream,
			FetchErrorKind::FileTooLarge => Self::FileTooLarge,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
	pub kind: FailureKind,
	pub message: String,
}

impl JobFailure {
	pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
		Self { kind, message: message.into() }
	}
}

impl From<FetchError> for JobFailure {
	fn from(error: FetchError) -> Self {
		Self {
			kind: error.kind.into(),
			message: error.message,
		}
	}
}

/// A unit of transcription work.
///
/// Fields are read-only from outside the crate; every state change goes through
/// the [`JobManager`](crate::manager::JobManager), which enforces
/// PENDING -> PROCESSING -> {COMPLETED, FAILED}.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
	id: JobId,
	url: String,
	priority: Priority,
	state: JobState,
	submitted_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
	started_at: Option<DateTime<Utc>>,
	completed_at: Option<DateTime<Utc>>,
	result: Option<Transcript>,
	error: Option<JobFailure>,
	#[serde(skip)]
	seq: u64,
}

impl Job {
	pub(crate) fn new(id: JobId, url: Url, priority: Priority, seq: u64, now: DateTime<Utc>) -> Self {
		Self {
			id,
			url: url.into(),
			priority,
			state: JobState::Pending,
			submitted_at: now,
			updated_at: now,
			started_at: None,
			completed_at: None,
			result: None,
			error: None,
			seq,
		}
	}

	#[must_use]
	pub const fn id(&self) -> JobId {
		self.id
	}

	#[must_use]
	pub fn url(&self) -> &str {
		&self.url
	}

	#[must_use]
	pub const fn priority(&self) -> Priority {
		self.priority
	}

	#[must_use]
	pub const fn state(&self) -> JobState {
		self.state
	}

	#[must_use]
	pub const fn submitted_at(&self) -> DateTime<Utc> {
		self.submitted_at
	}

	#[must_use]
	pub const fn updated_at(&self) -> DateTime<Utc> {
		self.updated_at
	}

	#[must_use]
	pub const fn started_at(&self) -> Option<DateTime<Utc>> {
		self.started_at
	}

	#[must_use]
	pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
		self.completed_at
	}

	#[must_use]
	pub const fn result(&self) -> Option<&Transcript> {
		self.result.as_ref()
	}

	#[must_use]
	pub const fn error(&self) -> Option<&JobFailure> {
		self.error.as_ref()
	}

	pub(crate) const fn seq(&self) -> u64 {
		self.seq
	}

	pub(crate) fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
		self.expect_state(JobState::Pending, "start")?;
		self.state = JobState::Processing;
		self.started_at = Some(now);
		self.updated_at = now;
		Ok(())
	}

	pub(crate) fn complete(&mut self, transcript: Transcript, now: DateTime<Utc>) -> Result<()> {
		self.expect_state(JobState::Processing, "complete")?;
		self.state = JobState::Completed;
		self.result = Some(transcript);
		self.completed_at = Some(now);
		self.updated_at = now;
		Ok(())
	}

	pub(crate) fn fail(&mut self, failure: JobFailure, now: DateTime<Utc>) -> Result<()> {
		self.expect_state(JobState::Processing, "fail")?;
		self.state = JobState::Failed;
		self.error = Some(failure);
		self.completed_at = Some(now);
		self.updated_at = now;
		Ok(())
	}

	fn expect_state(&self, expected: JobState, action: &'static str) -> Result<()> {
		if self.state == expected {
			Ok(())
		} else {
			Err(JobError::State {
				job_id: self.id,
				state: self.state,
				action,
			})
		}
	}
}

/// Checks that `raw` is an absolute http(s) URL pointing at a supported media file.
pub fn validate_url(raw: &str) -> Result<Url> {
	let url = Url::parse(raw.trim()).map_err(|e| JobError::Validation(format!("Malformed URL {raw:?}: {e}")))?;

	if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
		return Err(JobError::Validation(format!("Unsupported URL scheme: {}", url.scheme())));
	}

	if url.host_str().map_or(true, str::is_empty) {
		return Err(JobError::Validation(format!("URL {raw:?} has no host")));
	}

	let path = url.path().to_lowercase();
	let extension = path.rfind('.').map_or("", |idx| &path[idx..]);
	if !SUPPORTED_FORMATS.contains(&extension) {
		return Err(JobError::Validation(format!(
			"Unsupported audio format: {extension:?}. Supported formats: {}",
			SUPPORTED_FORMATS.join(", ")
		)));
	}

	Ok(url)
}
