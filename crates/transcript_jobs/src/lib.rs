pub mod cleanup;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod fixtures;
pub mod job;
pub mod llm;
pub mod manager;
pub mod metrics;
pub mod priority_queue;
pub mod response;
pub mod summarizer;
pub mod worker;

pub use cleanup::{spawn_cleanup_task, CleanupStats};
pub use config::EngineConfig;
pub use error::{FetchError, FetchErrorKind, GenerationError, GenerationErrorKind, JobError, Result};
pub use fetcher::{HttpTranscriptFetcher, TranscriptFetcher};
pub use job::{FailureKind, Job, JobFailure, JobId, JobState, Priority, Speaker, Transcript};
pub use llm::{GenerationRequest, OpenAiGenerator, TextGenerator};
pub use manager::{JobCounts, JobManager, SubmissionOutcome};
pub use metrics::JobMetrics;
pub use summarizer::{ConversationType, RejectReason, Summarizer, Summary, Topic, VerificationResponse, VerificationVerdict};
pub use worker::TranscriptionWorker;
