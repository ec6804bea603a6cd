use clap::Args;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the job engine. Flattened into the binary's CLI.
#[derive(Args, Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
	#[arg(long = "max-queue-size", env = "MAX_QUEUE_SIZE", default_value = "1000", help = "Maximum number of jobs waiting in the queue")]
	pub max_queue_size: usize,

	#[arg(
        long = "poll-interval-ms",
        env = "POLL_INTERVAL_MS",
        default_value = "1000",
        value_parser = parse_millis,
        help = "Worker sleep when the queue is empty, in milliseconds"
    )]
	pub poll_interval: Duration,

	#[arg(
        long = "job-timeout-secs",
        env = "JOB_TIMEOUT_SECS",
        default_value = "300",
        value_parser = parse_secs,
        help = "Upper bound on a single transcript fetch, in seconds"
    )]
	pub job_timeout: Duration,

	#[arg(
        long = "retention-secs",
        env = "RETENTION_SECS",
        default_value = "3600",
        value_parser = parse_secs,
        help = "How long finished jobs are kept before eviction, in seconds"
    )]
	pub retention: Duration,

	#[arg(
        long = "cleanup-interval-secs",
        env = "CLEANUP_INTERVAL_SECS",
        default_value = "3600",
        value_parser = parse_secs,
        help = "Period of the background cleanup sweep, in seconds"
    )]
	pub cleanup_interval: Duration,

	#[arg(
        long = "processing-timeout-secs",
        env = "PROCESSING_TIMEOUT_SECS",
        default_value = "1800",
        value_parser = parse_secs,
        help = "Jobs in PROCESSING longer than this are failed as stalled, in seconds"
    )]
	pub processing_timeout: Duration,

	#[arg(long = "min-transcript-length", env = "MIN_TRANSCRIPT_LENGTH", default_value = "50", help = "Shortest transcript (in characters) accepted for summarization")]
	pub min_transcript_length: usize,

	#[arg(
        long = "simulated-latency-ms",
        env = "SIMULATED_LATENCY_MS",
        default_value = "2000",
        value_parser = parse_millis,
        help = "Artificial delay of the fixture transcription backend, in milliseconds"
    )]
	pub simulated_latency: Duration,

	#[arg(long = "max-file-size-mb", env = "MAX_FILE_SIZE_MB", default_value = "100", help = "Largest media file accepted by the HEAD probe, in megabytes")]
	pub max_file_size_mb: u64,

	#[arg(
        long = "probe-timeout-secs",
        env = "PROBE_TIMEOUT_SECS",
        default_value = "10",
        value_parser = parse_secs,
        help = "Timeout of the HEAD probe, in seconds"
    )]
	pub probe_timeout: Duration,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			max_queue_size: 1000,
			poll_interval: Duration::from_millis(1000),
			job_timeout: Duration::from_secs(300),
			retention: Duration::from_secs(3600),
			cleanup_interval: Duration::from_secs(3600),
			processing_timeout: Duration::from_secs(1800),
			min_transcript_length: 50,
			simulated_latency: Duration::from_millis(2000),
			max_file_size_mb: 100,
			probe_timeout: Duration::from_secs(10),
		}
	}
}

impl EngineConfig {
	#[must_use]
	pub const fn max_file_size_bytes(&self) -> u64 {
		self.max_file_size_mb.saturating_mul(1024 * 1024)
	}

	pub fn validate(&self) -> Result<(), String> {
		if self.max_queue_size == 0 {
			return Err("max_queue_size must be greater than 0".to_string());
		}

		let durations = [
			("poll_interval", self.poll_interval),
			("job_timeout", self.job_timeout),
			("retention", self.retention),
			("cleanup_interval", self.cleanup_interval),
			("processing_timeout", self.processing_timeout),
			("probe_timeout", self.probe_timeout),
		];
		if let Some((name, _)) = durations.iter().find(|(_, value)| value.is_zero()) {
			return Err(format!("{name} must be greater than 0"));
		}

		if self.processing_timeout < self.job_timeout {
			return Err("processing_timeout must not be shorter than job_timeout".to_string());
		}

		Ok(())
	}
}

fn parse_secs(s: &str) -> Result<Duration, std::num::ParseIntError> {
	s.parse::<u64>().map(Duration::from_secs)
}

fn parse_millis(s: &str) -> Result<Duration, std::num::ParseIntError> {
	s.parse::<u64>().map(Duration::from_millis)
}
