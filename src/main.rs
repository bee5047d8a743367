mod app_state;
mod config;
mod models;
mod services;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use models::job::JobStatus;
use services::generation::WorkersAiImageClient;
use services::persistence::{JsonFileStore, PersistedState, StateStore};
use services::scheduler::Scheduler;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting variator batch engine");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");
    let settings = config.engine_settings();

    // Register application metrics
    metrics::describe_counter!("variation_jobs_completed", "Total generation jobs completed");
    metrics::describe_counter!("variation_jobs_failed", "Total generation jobs that failed");
    metrics::describe_histogram!(
        "variation_generation_seconds",
        "Time spent in one external generation call"
    );

    // Initialize services
    let generator = Arc::new(WorkersAiImageClient::new(
        config.cf_account_id.clone(),
        config.cf_api_token.clone(),
        &config.output_dir,
    ));
    let state = AppState::new(generator);

    // Rehydrate persisted queue membership and source registry
    let store = JsonFileStore::new(&config.state_path);
    let persisted = store.load().await.expect("Failed to load state snapshot");
    tracing::info!(
        jobs = persisted.jobs.len(),
        sources = persisted.sources.len(),
        "Rehydrating persisted state"
    );

    for source in persisted.sources {
        state.sources.insert(source);
    }
    // In-flight calls did not survive the restart; their jobs go back to
    // the queue.
    state.queue.enqueue(persisted.jobs.into_iter().map(|mut job| {
        if job.status == JobStatus::Processing {
            job.status = JobStatus::Queued;
        }
        job
    }));

    if state.queue.is_empty() {
        tracing::info!("No queued jobs, nothing to do");
        return;
    }

    // Process until drained
    let scheduler = Scheduler::new(
        Arc::clone(&state.queue),
        Arc::clone(&state.failed),
        Arc::clone(&state.results),
        Arc::clone(&state.sources),
        Arc::clone(&state.generator),
        settings,
    );

    tracing::info!(
        queued = state.queue.queued_count(),
        concurrency = settings.concurrency,
        "Starting job processing"
    );
    scheduler.run().await;

    tracing::info!(
        completed = state.results.len(),
        failed = state.failed.len(),
        "Batch finished"
    );

    // Persist whatever is left (failed items are session-local; only queue
    // membership and sources are part of the snapshot contract)
    let snapshot = PersistedState {
        jobs: state.queue.snapshot(),
        sources: state.sources.snapshot(),
    };
    store
        .save(&snapshot)
        .await
        .expect("Failed to save state snapshot");
}
