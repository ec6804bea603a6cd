use clap::Parser;
use std::time::Duration;
use transcript_jobs::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use transcript_jobs::EngineConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "transcript-processor")]
#[command(about = "Priority-queued transcription jobs with summarization and content verification", long_about = None)]
pub struct Config {
	/// Server host
	#[arg(long, env = "HOST", default_value = "0.0.0.0")]
	pub host: String,

	/// Server port
	#[arg(long, env = "PORT", default_value = "8000")]
	pub port: u16,

	/// Use JSON formatting for tracing
	#[arg(long, env = "LOG_JSON", default_value = "false")]
	pub log_json: bool,

	/// Log filter, e.g. `info,transcript_jobs=debug`
	#[arg(long, env = "RUST_LOG")]
	pub rust_log: Option<String>,

	/// Deployment environment name, attached to startup logs
	#[arg(long, env = "ENVIRONMENT", default_value = "dev")]
	pub environment: String,

	/// API key for the text-generation backend
	#[arg(long, env = "OPENAI_KEY", hide_env_values = true)]
	pub openai_key: String,

	/// Chat model used for summaries and verification
	#[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
	pub openai_model: String,

	/// Base URL of an OpenAI-compatible API
	#[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
	pub openai_base_url: String,

	/// Timeout of a single text-generation call, in seconds
	#[arg(long, env = "LLM_TIMEOUT_SECS", default_value = "60")]
	pub llm_timeout_secs: u64,

	/// Timeout applied to every HTTP request, in seconds
	#[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "150")]
	pub request_timeout_secs: u64,

	/// Skip the HEAD probe of submitted media URLs
	#[arg(long, env = "SKIP_URL_PROBE", default_value = "false")]
	pub skip_url_probe: bool,

	#[command(flatten)]
	pub engine: EngineConfig,
}

impl Config {
	#[must_use]
	pub const fn llm_timeout(&self) -> Duration {
		Duration::from_secs(self.llm_timeout_secs)
	}

	#[must_use]
	pub const fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	/// Validate configuration values
	pub fn validate(&self) -> Result<(), String> {
		self.engine.validate()?;

		if self.openai_key.trim().is_empty() {
			return Err("openai_key must not be empty".to_string());
		}

		if self.llm_timeout_secs == 0 {
			return Err("llm_timeout_secs must be greater than 0".to_string());
		}

		// A summary makes two generation calls inside one request.
		if self.request_timeout_secs <= self.llm_timeout_secs.saturating_mul(2) {
			return Err("request_timeout_secs must exceed twice llm_timeout_secs".to_string());
		}

		Ok(())
	}
}
