use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{FetchError, FetchErrorKind};
use crate::fixtures;
use crate::job::{JobId, Transcript};

/// Turns a job's URL into a transcript. Implementations must be safe to call concurrently.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
	async fn fetch(&self, job_id: JobId, url: &str) -> Result<Transcript, FetchError>;
}

/// Probes the media URL over HTTP, then returns a fixture transcript after a simulated delay.
pub struct HttpTranscriptFetcher {
	client: reqwest::Client,
	probe: bool,
	probe_timeout: Duration,
	max_file_size_bytes: u64,
	simulated_latency: Duration,
}

impl HttpTranscriptFetcher {
	#[must_use]
	pub fn new(config: &EngineConfig, probe: bool) -> Self {
		Self {
			client: reqwest::Client::new(),
			probe,
			probe_timeout: config.probe_timeout,
			max_file_size_bytes: config.max_file_size_bytes(),
			simulated_latency: config.simulated_latency,
		}
	}

	async fn probe(&self, url: &str) -> Result<(), FetchError> {
		let response = self.client.head(url).timeout(self.probe_timeout).send().await.map_err(classify_request_error)?;

		if response.status() != StatusCode::OK {
			return Err(FetchError::invalid_url(format!("URL returned status code: {}", response.status().as_u16())));
		}

		let headers = response.headers();
		if let Some(length) = headers.get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()).and_then(|v| v.parse::<u64>().ok()) {
			if length > self.max_file_size_bytes {
				return Err(FetchError::new(
					FetchErrorKind::FileTooLarge,
					format!("File size ({:.1}MB) exceeds maximum allowed size of {}MB", mb(length), self.max_file_size_bytes / (1024 * 1024)),
				));
			}
		}

		let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or_default();
		if !content_type.starts_with("audio/") && !content_type.starts_with("video/") {
			warn!(%url, %content_type, "Unexpected content type for media URL");
		}

		Ok(())
	}
}

#[async_trait]
impl TranscriptFetcher for HttpTranscriptFetcher {
	async fn fetch(&self, job_id: JobId, url: &str) -> Result<Transcript, FetchError> {
		if self.probe {
			self.probe(url).await?;
			debug!(%job_id, %url, "HEAD probe passed");
		}

		tokio::time::sleep(self.simulated_latency).await;
		Ok(fixtures::transcript_for(job_id, url))
	}
}

#[allow(clippy::cast_precision_loss)]
fn mb(bytes: u64) -> f64 {
	bytes as f64 / (1024.0 * 1024.0)
}

fn classify_request_error(error: reqwest::Error) -> FetchError {
	if error.is_timeout() {
		FetchError::timeout("Timeout while validating URL")
	} else if error.is_connect() || error.is_builder() {
		FetchError::invalid_url(format!("Error accessing URL: {error}"))
	} else {
		FetchError::upstream(format!("Error accessing URL: {error}"))
	}
}
