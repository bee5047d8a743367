use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::models::options::OptionSet;

/// Status of a generation job while it lives in the queue. Terminal states
/// do not exist here: a finished job leaves the queue entirely, either as a
/// [`ResultRecord`] or a [`FailedItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
}

/// One concrete generation request: a source input plus a fully-resolved
/// prompt derived from a single combination of option values.
///
/// Jobs are immutable after creation except for the status transition, the
/// retry counter, and their position in the queue ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    /// Reference to the registered source input, by id, not ownership.
    pub source_id: Uuid,
    /// Natural-language generation instructions for the external service.
    pub prompt: String,
    /// Human-readable summary of the option values this job encodes.
    pub summary: String,
    /// Immutable snapshot of the option set active at creation time.
    pub options: OptionSet,
    pub status: JobStatus,
    pub retry_count: u32,
}

/// Failure class assigned by the classifier. Each class carries its own
/// retry ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Infrastructure trouble: overload, timeout, rate limit.
    Transient,
    /// The generation service's content-moderation layer rejected the
    /// request.
    Policy,
}

/// A job that errored, held until retried or dismissed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedItem {
    pub job: Job,
    pub error: String,
    pub class: FailureClass,
    /// Carried-forward attempt count, incremented exactly once per failure.
    pub retry_count: u32,
    pub failed_at: DateTime<Utc>,
}

impl FailedItem {
    /// Derive a fresh queue entry from this failure. The retry counter is
    /// preserved so ceilings keep counting across attempts.
    pub fn into_job(self) -> Job {
        Job {
            status: JobStatus::Queued,
            retry_count: self.retry_count,
            ..self.job
        }
    }
}

/// A successfully generated artifact, appended by the scheduler's success
/// path and deletable by the consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: Uuid,
    pub source_id: Uuid,
    pub prompt: String,
    pub summary: String,
    /// Opaque reference to the generated artifact (storage key or path).
    pub artifact: String,
    pub created_at: DateTime<Utc>,
}

/// A registered source input. The engine never owns image bytes; the
/// generation collaborator resolves `image_key` itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: Uuid,
    pub name: String,
    pub image_key: String,
}

impl SourceRecord {
    pub fn new(name: impl Into<String>, image_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            image_key: image_key.into(),
        }
    }
}
