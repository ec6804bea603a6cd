use std::sync::Arc;
use transcript_jobs::{EngineConfig, JobManager, Summarizer};

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;

pub use config::Config;
pub use error::ApiError;
pub use routes::router;

/// Shared handles for request handlers. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
	pub manager: Arc<JobManager>,
	pub summarizer: Arc<Summarizer>,
	pub engine: Arc<EngineConfig>,
}

impl AppState {
	#[must_use]
	pub const fn new(manager: Arc<JobManager>, summarizer: Arc<Summarizer>, engine: Arc<EngineConfig>) -> Self {
		Self { manager, summarizer, engine }
	}
}
