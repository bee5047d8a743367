use std::collections::BTreeMap;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::job::{FailedItem, ResultRecord, SourceRecord};
use crate::models::options::EngineSettings;
use crate::services::classifier;

/// Failed jobs awaiting retry or dismissal.
#[derive(Default)]
pub struct FailedStore {
    items: Mutex<Vec<FailedItem>>,
}

impl FailedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: FailedItem) {
        self.items.lock().push(item);
    }

    pub fn snapshot(&self) -> Vec<FailedItem> {
        self.items.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dismiss a failed item permanently.
    pub fn delete(&self, job_id: Uuid) -> bool {
        let mut items = self.items.lock();
        let before = items.len();
        items.retain(|item| item.job.id != job_id);
        items.len() != before
    }

    /// Take a single item out for retry. Blocked items are left in place.
    pub fn take_retryable(&self, job_id: Uuid, settings: &EngineSettings) -> Option<FailedItem> {
        let mut items = self.items.lock();
        let index = items.iter().position(|item| {
            item.job.id == job_id
                && !classifier::is_blocked(item.class, item.retry_count, settings)
        })?;
        Some(items.remove(index))
    }

    /// Take every non-blocked item out for bulk retry, preserving order.
    pub fn take_all_retryable(&self, settings: &EngineSettings) -> Vec<FailedItem> {
        let mut items = self.items.lock();
        let (retryable, blocked): (Vec<FailedItem>, Vec<FailedItem>) =
            std::mem::take(&mut *items).into_iter().partition(|item| {
                !classifier::is_blocked(item.class, item.retry_count, settings)
            });
        *items = blocked;
        retryable
    }
}

/// Append-only store of successful generation results. Records are only
/// appended by the scheduler's success path; the consumer may delete them.
#[derive(Default)]
pub struct ResultStore {
    records: Mutex<Vec<ResultRecord>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: ResultRecord) {
        self.records.lock().push(record);
    }

    pub fn snapshot(&self) -> Vec<ResultRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn delete(&self, id: Uuid) -> bool {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|record| record.id != id);
        records.len() != before
    }
}

/// Registered source inputs, looked up by id when a job is dispatched.
#[derive(Default)]
pub struct SourceRegistry {
    sources: Mutex<BTreeMap<Uuid, SourceRecord>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, source: SourceRecord) {
        self.sources.lock().insert(source.id, source);
    }

    pub fn get(&self, id: Uuid) -> Option<SourceRecord> {
        self.sources.lock().get(&id).cloned()
    }

    pub fn remove(&self, id: Uuid) -> Option<SourceRecord> {
        self.sources.lock().remove(&id)
    }

    pub fn snapshot(&self) -> Vec<SourceRecord> {
        self.sources.lock().values().cloned().collect()
    }
}
