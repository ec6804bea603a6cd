use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::{GenerationError, GenerationErrorKind};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
	pub system_prompt: String,
	pub user_content: String,
	pub max_tokens: Option<u32>,
	pub temperature: f32,
	/// Ask the backend for a JSON object. Callers still parse tolerantly.
	pub expect_json: bool,
}

/// Text-generation backend. Returns raw text; callers own any parsing.
#[async_trait]
pub trait TextGenerator: Send + Sync {
	async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
	role: &'a str,
	content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
	#[serde(rename = "type")]
	kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
	model: &'a str,
	messages: [ChatMessage<'a>; 2],
	max_tokens: u32,
	temperature: f32,
	#[serde(skip_serializing_if = "Option::is_none")]
	response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct ChatResponse {
	choices: Vec<Choice>,
	usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
	message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
	content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
	prompt_tokens: u64,
	completion_tokens: u64,
	total_tokens: u64,
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiGenerator {
	client: reqwest::Client,
	api_key: String,
	model: String,
	base_url: String,
	timeout: Duration,
}

impl OpenAiGenerator {
	pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
		Self {
			client: reqwest::Client::new(),
			api_key: api_key.into(),
			model: model.into(),
			base_url: base_url.into().trim_end_matches('/').to_string(),
			timeout,
		}
	}
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
	async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
		debug!(model = %self.model, input_chars = request.user_content.len(), expect_json = request.expect_json, "Generating completion");

		let body = ChatRequest {
			model: &self.model,
			messages: [
				ChatMessage {
					role: "system",
					content: &request.system_prompt,
				},
				ChatMessage {
					role: "user",
					content: &request.user_content,
				},
			],
			max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
			temperature: request.temperature,
			response_format: request.expect_json.then_some(ResponseFormat { kind: "json_object" }),
		};

		let response = self
			.client
			.post(format!("{}/chat/completions", self.base_url))
			.bearer_auth(&self.api_key)
			.timeout(self.timeout)
			.json(&body)
			.send()
			.await
			.map_err(classify_transport_error)?;

		let status = response.status();
		if !status.is_success() {
			let detail = response.text().await.unwrap_or_default();
			let error = classify_status(status, &detail);
			error!(status = status.as_u16(), kind = %error.kind, "Language model request failed");
			return Err(error);
		}

		let parsed: ChatResponse = response
			.json()
			.await
			.map_err(|e| GenerationError::new(GenerationErrorKind::Upstream, format!("Malformed completion response: {e}")))?;

		if let Some(usage) = &parsed.usage {
			info!(
				input_tokens = usage.prompt_tokens,
				output_tokens = usage.completion_tokens,
				total_tokens = usage.total_tokens,
				"Completion generated"
			);
		}

		let output = parsed.choices.into_iter().filter_map(|choice| choice.message.content).collect::<Vec<_>>().join(" ");
		Ok(output)
	}
}

fn classify_transport_error(error: reqwest::Error) -> GenerationError {
	if error.is_timeout() {
		GenerationError::new(GenerationErrorKind::Timeout, "Request to language model timed out")
	} else if error.is_connect() {
		GenerationError::new(GenerationErrorKind::Connection, format!("Failed to connect to language model service: {error}"))
	} else {
		GenerationError::new(GenerationErrorKind::Upstream, format!("Language model error: {error}"))
	}
}

fn classify_status(status: StatusCode, detail: &str) -> GenerationError {
	match status {
		StatusCode::TOO_MANY_REQUESTS => GenerationError::new(GenerationErrorKind::RateLimit, "Rate limit exceeded for language model"),
		StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GenerationError::new(GenerationErrorKind::Timeout, "Request to language model timed out"),
		StatusCode::BAD_REQUEST if detail.to_lowercase().contains("maximum context length") => GenerationError::new(GenerationErrorKind::TokenLimit, "Input exceeds maximum token limit"),
		_ => GenerationError::new(GenerationErrorKind::Upstream, format!("Language model error ({}): {detail}", status.as_u16())),
	}
}
