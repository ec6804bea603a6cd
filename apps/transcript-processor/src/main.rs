use anyhow::{anyhow, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt::format::JsonFields, layer::SubscriberExt, util::SubscriberInitExt, Layer};
use transcript_jobs::{spawn_cleanup_task, HttpTranscriptFetcher, JobManager, OpenAiGenerator, Summarizer, TranscriptionWorker};
use transcript_processor::{router, AppState, Config};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
	dotenvy::dotenv().ok();

	let config = Config::parse();
	config.validate().map_err(|e| anyhow!(e))?;

	init_tracing(&config)?;

	info!(
		environment = %config.environment,
		model = %config.openai_model,
		max_queue_size = config.engine.max_queue_size,
		url_probe = !config.skip_url_probe,
		"🎯 Starting transcript processor"
	);

	let engine = Arc::new(config.engine.clone());
	let manager = Arc::new(JobManager::from_config(&engine)?);
	let fetcher = Arc::new(HttpTranscriptFetcher::new(&engine, !config.skip_url_probe));
	let generator = Arc::new(OpenAiGenerator::new(config.openai_key.clone(), config.openai_model.clone(), config.openai_base_url.clone(), config.llm_timeout()));
	let summarizer = Arc::new(Summarizer::new(generator, engine.min_transcript_length));

	let shutdown_token = CancellationToken::new();

	let worker = TranscriptionWorker::new(Arc::clone(&manager), fetcher, &engine).spawn(shutdown_token.clone());
	let cleanup = spawn_cleanup_task(Arc::clone(&manager), engine.cleanup_interval, engine.retention, engine.processing_timeout, shutdown_token.clone());

	let state = AppState::new(manager, summarizer, engine);
	let app = router(state, config.request_timeout());

	let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
	info!("listening on {}", listener.local_addr()?);

	let signal_token = shutdown_token.clone();
	tokio::spawn(async move {
		wait_for_shutdown_signal().await;
		info!("🛑 Shutdown signal received, initiating shutdown...");
		signal_token.cancel();
	});

	let server_token = shutdown_token.clone();
	let served = axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			server_token.cancelled().await;
		})
		.await;

	// Stop background tasks even if the server failed.
	shutdown_token.cancel();
	info!("Server stopped, waiting for background tasks");

	match tokio::time::timeout(SHUTDOWN_TIMEOUT, async { tokio::join!(worker, cleanup) }).await {
		Ok((worker, cleanup)) => {
			if let Err(e) = worker {
				error!("Worker task ended abnormally: {}", e);
			}
			if let Err(e) = cleanup {
				error!("Cleanup task ended abnormally: {}", e);
			}
			info!("✅ Graceful shutdown completed");
		}
		Err(_) => warn!("Shutdown timeout - a job was still in flight"),
	}

	served?;
	Ok(())
}

async fn wait_for_shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!("Failed to listen for Ctrl+C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut sigterm) => {
				sigterm.recv().await;
			}
			Err(e) => {
				error!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}
}

fn init_tracing(config: &Config) -> Result<()> {
	let filter = EnvFilter::try_new(config.rust_log.as_deref().unwrap_or("info"))?;

	tracing_subscriber::registry()
		.with(if config.log_json {
			Box::new(
				tracing_subscriber::fmt::layer()
					.fmt_fields(JsonFields::default())
					.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
					.with_filter(filter),
			) as Box<dyn Layer<_> + Send + Sync>
		} else {
			Box::new(
				tracing_subscriber::fmt::layer()
					.event_format(tracing_subscriber::fmt::format().pretty())
					.with_filter(filter),
			)
		})
		.try_init()?;

	Ok(())
}
