use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{JobError, Result};
use crate::job::{JobId, JobState, Speaker, Transcript};
use crate::llm::{GenerationRequest, TextGenerator};
use crate::manager::JobManager;
use crate::response::extract_json;

pub const MAX_SUMMARY_TOKENS: u32 = 1000;

const SUMMARY_TEMPERATURE: f32 = 0.7;
const METADATA_TEMPERATURE: f32 = 0.3;
const VERIFY_TEMPERATURE: f32 = 0.1;

const SUMMARY_PROMPT: &str = "Create a comprehensive summary of the following transcript. \
	Focus on key points, main themes, and important takeaways. Be concise but thorough.";

const METADATA_PROMPT: &str = r#"Analyze the following transcript and extract metadata in JSON format:
{
    "conversation_type": "EDUCATIONAL" | "FORMAL" | "COMEDY" | "PROFESSIONAL" | "CASUAL" | "INTERVIEW",
    "topics": [{"name": "topic name", "confidence_score": 0.0 to 1.0}],
    "key_points": ["point 1", "point 2"]
}
Base the conversation_type on the overall tone and content of the discussion."#;

const VERIFICATION_PROMPT: &str = r#"Analyze the following text for inappropriate content, including hate speech, profanity and personal identifying information (PII).
Respond with a JSON object:
{
    "is_safe": boolean,
    "inappropriate_content": boolean,
    "profanity": boolean,
    "pii": boolean,
    "reject_reason": null or one of ["PROFANITY", "HATE_SPEECH", "PII"],
    "rationale": "one sentence explaining the verdict"
}"#;

const EXAMPLE_SUMMARIES: [(&str, &str); 2] = [
	(
		"Host: Welcome back to Tech Talk. Today we're looking at why small teams are moving their builds to the cloud. Guest: Mostly cost. Local build farms sit idle at night.",
		"A tech podcast host and guest discuss small teams moving builds to cloud infrastructure, with cost and idle local hardware as the main drivers.",
	),
	(
		"Lead: Let's review the incident from Tuesday. Engineer: The cache expired all keys at once and the database took the full load for ten minutes. Lead: So we need jittered expiry.",
		"An incident review attributes a ten-minute database overload to simultaneous cache expiry. The team agrees to add jitter to key expiry.",
	),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationType {
	Educational,
	Formal,
	Comedy,
	Professional,
	Casual,
	Interview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
	pub name: String,
	pub confidence_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
	pub transcript_id: JobId,
	pub conversation_type: ConversationType,
	pub summary_text: String,
	pub topics: Vec<Topic>,
	pub speakers: Vec<Speaker>,
	pub duration_secs: f64,
	pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
	Profanity,
	HateSpeech,
	Pii,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationVerdict {
	pub is_safe: bool,
	pub inappropriate_content: bool,
	pub profanity: bool,
	pub pii: bool,
	#[serde(default)]
	pub reject_reason: Option<RejectReason>,
	pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResponse {
	pub transcript_id: JobId,
	#[serde(flatten)]
	pub verdict: VerificationVerdict,
}

#[derive(Deserialize)]
struct ConversationMetadata {
	conversation_type: ConversationType,
	topics: Vec<Topic>,
	key_points: Vec<String>,
}

impl ConversationMetadata {
	fn validate(&self) -> Result<()> {
		if let Some(topic) = self.topics.iter().find(|t| !(0.0..=1.0).contains(&t.confidence_score)) {
			return Err(JobError::Parse(format!(
				"Topic {:?} has confidence score {} outside [0, 1]",
				topic.name, topic.confidence_score
			)));
		}
		Ok(())
	}
}

/// Request-driven summarization and content-safety checks over completed jobs.
pub struct Summarizer {
	generator: Arc<dyn TextGenerator>,
	min_transcript_length: usize,
}

impl Summarizer {
	pub fn new(generator: Arc<dyn TextGenerator>, min_transcript_length: usize) -> Self {
		Self { generator, min_transcript_length }
	}

	/// Summarizes the transcript of a COMPLETED job.
	///
	/// Any other state is a [`JobError::State`]; the generator is not called.
	pub async fn summarize(&self, manager: &JobManager, job_id: &JobId) -> Result<Summary> {
		let job = manager.get_job(job_id).await?;
		let transcript = match (job.state(), job.result()) {
			(JobState::Completed, Some(transcript)) => transcript.clone(),
			(state, _) => {
				return Err(JobError::State {
					job_id: *job_id,
					state,
					action: "summarize",
				})
			}
		};

		self.summarize_transcript(&transcript).await
	}

	pub async fn summarize_transcript(&self, transcript: &Transcript) -> Result<Summary> {
		let length = transcript.text.trim().chars().count();
		if length < self.min_transcript_length {
			return Err(JobError::Validation(format!(
				"Transcript too short ({length} characters). Minimum length: {} characters",
				self.min_transcript_length
			)));
		}

		info!(job_id = %transcript.job_id, "Generating transcript summary");
		let summary_text = self
			.generator
			.generate(&GenerationRequest {
				system_prompt: SUMMARY_PROMPT.to_string(),
				user_content: format!("{}\nTranscript: {}", few_shot_examples(), transcript.text),
				max_tokens: Some(MAX_SUMMARY_TOKENS),
				temperature: SUMMARY_TEMPERATURE,
				expect_json: false,
			})
			.await?;
		let summary_text = summary_text.trim().to_string();
		if summary_text.is_empty() {
			return Err(JobError::Parse("language model returned an empty summary".to_string()));
		}

		info!(job_id = %transcript.job_id, "Extracting transcript metadata");
		let raw = self
			.generator
			.generate(&GenerationRequest {
				system_prompt: METADATA_PROMPT.to_string(),
				user_content: transcript.text.clone(),
				max_tokens: None,
				temperature: METADATA_TEMPERATURE,
				expect_json: true,
			})
			.await?;
		let metadata: ConversationMetadata = extract_json(&raw).inspect_err(|e| warn!(job_id = %transcript.job_id, error = %e, "Unusable metadata from language model"))?;
		metadata.validate()?;

		info!(job_id = %transcript.job_id, conversation_type = ?metadata.conversation_type, topics = metadata.topics.len(), "Summary generated");
		Ok(Summary {
			transcript_id: transcript.job_id,
			conversation_type: metadata.conversation_type,
			summary_text,
			topics: metadata.topics,
			speakers: transcript.speakers.clone(),
			duration_secs: transcript.duration_secs,
			key_points: metadata.key_points,
		})
	}

	/// Runs the content-safety check over `text`.
	///
	/// An unparseable verdict is a [`JobError::Parse`], never a default "safe".
	pub async fn verify(&self, text: &str) -> Result<VerificationVerdict> {
		info!(input_chars = text.len(), "Verifying content safety");
		let raw = self
			.generator
			.generate(&GenerationRequest {
				system_prompt: VERIFICATION_PROMPT.to_string(),
				user_content: text.to_string(),
				max_tokens: None,
				temperature: VERIFY_TEMPERATURE,
				expect_json: true,
			})
			.await?;

		let verdict: VerificationVerdict = extract_json(&raw)?;
		if !verdict.is_safe {
			warn!(reject_reason = ?verdict.reject_reason, "Content flagged as unsafe");
		}
		Ok(verdict)
	}

	pub async fn verify_summary(&self, summary: &Summary) -> Result<VerificationResponse> {
		let verdict = self.verify(&summary.summary_text).await?;
		Ok(VerificationResponse {
			transcript_id: summary.transcript_id,
			verdict,
		})
	}
}

fn few_shot_examples() -> String {
	let mut prompt = String::from("Here are some example transcript summaries:\n");
	for (transcript, summary) in EXAMPLE_SUMMARIES {
		prompt.push_str(&format!("Transcript: {transcript}\nSummary: {summary}\n\n"));
	}
	prompt
}
