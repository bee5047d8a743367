use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::models::job::{FailedItem, FailureClass, Job, ResultRecord};
use crate::models::options::EngineSettings;
use crate::services::classifier;
use crate::services::generation::{GenerationError, GenerationService, ShapeHints};
use crate::services::queue::{FinishOutcome, JobQueue};
use crate::services::stores::{FailedStore, ResultStore, SourceRegistry};

/// Lifecycle notifications emitted by the scheduler. Delivered on an
/// injected channel so the engine runs (and tests) without any log sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    JobStarted { job_id: Uuid },
    JobCompleted { job_id: Uuid },
    JobFailed { job_id: Uuid, class: FailureClass },
    JobDiscarded { job_id: Uuid },
    /// The queue ran dry and the loop ended on its own.
    Drained,
    /// An external stop ended the loop with jobs still queued.
    Stopped,
}

/// How many recent generation durations feed the ETA estimate.
const DURATION_SAMPLE_WINDOW: usize = 10;

/// Drives queued jobs through the external generation service under a
/// bounded concurrency cap.
///
/// One coordinating loop admits head-most QUEUED jobs while fewer than
/// `concurrency` calls are in flight, then reaps whichever call finishes
/// first; completion order is a race and carries no guarantee. A stop
/// request only suppresses admission; in-flight calls always run to
/// resolution. The loop ends on its own once nothing is queued or running.
pub struct Scheduler {
    queue: Arc<JobQueue>,
    failed: Arc<FailedStore>,
    results: Arc<ResultStore>,
    sources: Arc<SourceRegistry>,
    generator: Arc<dyn GenerationService>,
    settings: EngineSettings,
    shape: ShapeHints,
    events: Option<UnboundedSender<EngineEvent>>,
    stop_requested: AtomicBool,
    active: AtomicBool,
    durations: Mutex<VecDeque<Duration>>,
}

impl Scheduler {
    pub fn new(
        queue: Arc<JobQueue>,
        failed: Arc<FailedStore>,
        results: Arc<ResultStore>,
        sources: Arc<SourceRegistry>,
        generator: Arc<dyn GenerationService>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            queue,
            failed,
            results,
            sources,
            generator,
            settings: settings.clamped(),
            shape: ShapeHints::default(),
            events: None,
            stop_requested: AtomicBool::new(false),
            active: AtomicBool::new(false),
            durations: Mutex::new(VecDeque::with_capacity(DURATION_SAMPLE_WINDOW)),
        }
    }

    pub fn with_shape(mut self, shape: ShapeHints) -> Self {
        self.shape = shape;
        self
    }

    /// Inject the event channel. Without one the scheduler stays silent.
    pub fn with_events(mut self, sender: UnboundedSender<EngineEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop admitting new jobs. In-flight calls are never aborted; the run
    /// loop returns once they have all resolved.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Process the queue until drained or stopped. Never panics or returns
    /// an error across this boundary: every generation failure becomes a
    /// failed item.
    pub async fn run(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);

        let mut in_flight: JoinSet<(Job, Result<String, GenerationError>, Duration)> =
            JoinSet::new();

        loop {
            if !self.stop_requested.load(Ordering::SeqCst) {
                while in_flight.len() < self.settings.concurrency {
                    let Some(job) = self.queue.dequeue_next_eligible() else {
                        break;
                    };
                    self.start(job, &mut in_flight);
                }
            }

            if in_flight.is_empty() {
                // Nothing running and nothing admissible: drained, or
                // stopped with only queued work left behind.
                break;
            }

            match in_flight.join_next().await {
                Some(Ok((job, outcome, elapsed))) => self.settle(job, outcome, elapsed),
                Some(Err(e)) => {
                    // A generation task must not panic; losing one silently
                    // would leak its PROCESSING slot, so shout.
                    tracing::error!(error = %e, "generation task aborted unexpectedly");
                }
                None => break,
            }
        }

        self.active.store(false, Ordering::SeqCst);
        if self.queue.is_empty() {
            self.emit(EngineEvent::Drained);
        } else {
            self.emit(EngineEvent::Stopped);
        }
        tracing::info!(
            queued = self.queue.queued_count(),
            failed = self.failed.len(),
            results = self.results.len(),
            "scheduler loop finished"
        );
    }

    fn start(
        &self,
        job: Job,
        in_flight: &mut JoinSet<(Job, Result<String, GenerationError>, Duration)>,
    ) {
        tracing::info!(job_id = %job.id, summary = %job.summary, "starting generation job");
        self.emit(EngineEvent::JobStarted { job_id: job.id });

        let generator = Arc::clone(&self.generator);
        let source = self.sources.get(job.source_id);
        let hints = self.shape.clone();

        in_flight.spawn(async move {
            let started = Instant::now();
            let outcome = match source {
                Some(source) => generator.generate(&source, &job.prompt, &hints).await,
                None => Err(GenerationError::Unknown(format!(
                    "source {} is no longer registered",
                    job.source_id
                ))),
            };
            (job, outcome, started.elapsed())
        });
    }

    /// Route one resolved call. The queue removal and the store append are
    /// each atomic; admission only counts in-flight tasks, so the gap
    /// between them can neither break the cap nor double-schedule the job.
    fn settle(&self, job: Job, outcome: Result<String, GenerationError>, elapsed: Duration) {
        if self.queue.finish(job.id) == FinishOutcome::Discard {
            // Removed while in flight: drop the result, no retry accounting.
            tracing::info!(job_id = %job.id, "discarding result of removed job");
            self.emit(EngineEvent::JobDiscarded { job_id: job.id });
            return;
        }

        match outcome {
            Ok(artifact) => {
                self.record_duration(elapsed);
                metrics::counter!("variation_jobs_completed").increment(1);
                metrics::histogram!("variation_generation_seconds")
                    .record(elapsed.as_secs_f64());
                tracing::info!(
                    job_id = %job.id,
                    artifact = %artifact,
                    duration_ms = elapsed.as_millis() as u64,
                    "job completed"
                );
                self.results.push(ResultRecord {
                    id: Uuid::new_v4(),
                    source_id: job.source_id,
                    prompt: job.prompt,
                    summary: job.summary,
                    artifact,
                    created_at: Utc::now(),
                });
                self.emit(EngineEvent::JobCompleted { job_id: job.id });
            }
            Err(error) => {
                let class = classifier::classify(error.message());
                metrics::counter!("variation_jobs_failed").increment(1);
                tracing::warn!(
                    job_id = %job.id,
                    class = %class,
                    error = %error,
                    "job failed"
                );
                let job_id = job.id;
                self.failed.push(FailedItem {
                    retry_count: job.retry_count + 1,
                    error: error.message().to_string(),
                    class,
                    failed_at: Utc::now(),
                    job,
                });
                self.emit(EngineEvent::JobFailed { job_id, class });
            }
        }
    }

    /// Re-enqueue a single failed item. Blocked items are refused and must
    /// be deleted instead. Returns whether the job re-entered the queue.
    pub fn retry(&self, job_id: Uuid) -> bool {
        match self.failed.take_retryable(job_id, &self.settings) {
            Some(item) => {
                tracing::info!(job_id = %job_id, retry_count = item.retry_count, "retrying failed job");
                self.queue.enqueue([item.into_job()]);
                true
            }
            None => false,
        }
    }

    /// Re-enqueue every failed item still under its class ceiling. Returns
    /// how many re-entered the queue.
    pub fn retry_all(&self) -> usize {
        let items = self.failed.take_all_retryable(&self.settings);
        let count = items.len();
        if count > 0 {
            tracing::info!(count, "bulk retry of failed jobs");
            self.queue
                .enqueue(items.into_iter().map(FailedItem::into_job));
        }
        count
    }

    /// Advisory estimate of remaining runtime from the rolling duration
    /// sample. None until at least one job has completed.
    pub fn eta(&self) -> Option<Duration> {
        let durations = self.durations.lock();
        if durations.is_empty() {
            return None;
        }
        let avg = durations.iter().sum::<Duration>() / durations.len() as u32;
        let remaining = self.queue.len() as u32;
        Some(avg * remaining.div_ceil(self.settings.concurrency as u32))
    }

    fn record_duration(&self, elapsed: Duration) {
        let mut durations = self.durations.lock();
        if durations.len() == DURATION_SAMPLE_WINDOW {
            durations.pop_front();
        }
        durations.push_back(elapsed);
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(sender) = &self.events {
            // A dropped receiver is not the scheduler's problem.
            let _ = sender.send(event);
        }
    }
}
