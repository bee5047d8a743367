use std::collections::HashSet;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::job::{Job, JobStatus};

/// Direction for single-item reorder operations. Moves past a boundary are
/// clamped, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reorder {
    Up,
    Down,
    ToTop,
    ToBottom,
}

/// Outcome of [`JobQueue::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The job was queued and has been deleted.
    Removed,
    /// The job is in flight; it stays in the queue until its call resolves,
    /// at which point the result is discarded.
    DeferredToResolve,
    NotFound,
}

/// Outcome of [`JobQueue::finish`], reported to the scheduler so it knows
/// whether to record or discard the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    Record,
    Discard,
    Unknown,
}

#[derive(Default)]
struct QueueState {
    /// Single total order, head at index 0. "Process top to bottom" is a
    /// literal invariant over this vector.
    jobs: Vec<Job>,
    /// Jobs removed while in flight; their eventual result is dropped.
    discard_on_resolve: HashSet<Uuid>,
}

/// The authoritative ordered collection of unfinished jobs.
///
/// All mutations go through one mutex so every operation is atomic with
/// respect to every other; the lock is never held across an await point.
#[derive(Default)]
pub struct JobQueue {
    state: Mutex<QueueState>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append jobs to the tail in the given order.
    pub fn enqueue(&self, jobs: impl IntoIterator<Item = Job>) {
        let mut state = self.state.lock();
        state.jobs.extend(jobs);
    }

    /// Pop the head-most QUEUED job, transitioning it to PROCESSING. The job
    /// stays a member of the queue until [`finish`](Self::finish).
    pub fn dequeue_next_eligible(&self) -> Option<Job> {
        let mut state = self.state.lock();
        let job = state
            .jobs
            .iter_mut()
            .find(|job| job.status == JobStatus::Queued)?;
        job.status = JobStatus::Processing;
        Some(job.clone())
    }

    /// Remove a job. A PROCESSING job cannot leave mid-flight; it is marked
    /// for discard and stays until its call resolves.
    pub fn remove(&self, id: Uuid) -> RemoveOutcome {
        let mut state = self.state.lock();
        let Some(index) = state.jobs.iter().position(|job| job.id == id) else {
            return RemoveOutcome::NotFound;
        };
        match state.jobs[index].status {
            JobStatus::Queued => {
                state.jobs.remove(index);
                RemoveOutcome::Removed
            }
            JobStatus::Processing => {
                state.discard_on_resolve.insert(id);
                RemoveOutcome::DeferredToResolve
            }
        }
    }

    /// Take a resolved job out of the queue and report whether its result
    /// should be recorded or discarded.
    pub fn finish(&self, id: Uuid) -> FinishOutcome {
        let mut state = self.state.lock();
        let Some(index) = state.jobs.iter().position(|job| job.id == id) else {
            state.discard_on_resolve.remove(&id);
            return FinishOutcome::Unknown;
        };
        state.jobs.remove(index);
        if state.discard_on_resolve.remove(&id) {
            FinishOutcome::Discard
        } else {
            FinishOutcome::Record
        }
    }

    /// Move a single job within the ordering, clamped at the boundaries.
    /// Returns false when the id is unknown.
    pub fn reorder(&self, id: Uuid, direction: Reorder) -> bool {
        let mut state = self.state.lock();
        let Some(index) = state.jobs.iter().position(|job| job.id == id) else {
            return false;
        };
        let last = state.jobs.len() - 1;
        match direction {
            Reorder::Up if index > 0 => state.jobs.swap(index, index - 1),
            Reorder::Down if index < last => state.jobs.swap(index, index + 1),
            Reorder::ToTop if index > 0 => {
                let job = state.jobs.remove(index);
                state.jobs.insert(0, job);
            }
            Reorder::ToBottom if index < last => {
                let job = state.jobs.remove(index);
                state.jobs.push(job);
            }
            // Already at the requested extreme.
            _ => {}
        }
        true
    }

    /// Splice the matched jobs to the front, preserving their relative order.
    /// Used for "prioritize everything from this source".
    pub fn promote(&self, ids: &[Uuid]) {
        let mut state = self.state.lock();
        let (mut promoted, rest): (Vec<Job>, Vec<Job>) = std::mem::take(&mut state.jobs)
            .into_iter()
            .partition(|job| ids.contains(&job.id));
        promoted.extend(rest);
        state.jobs = promoted;
    }

    /// Drop every QUEUED job. In-flight jobs are untouched.
    pub fn clear_queued(&self) {
        let mut state = self.state.lock();
        state.jobs.retain(|job| job.status != JobStatus::Queued);
    }

    /// Ordered snapshot for display and persistence.
    pub fn snapshot(&self) -> Vec<Job> {
        self.state.lock().jobs.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn queued_count(&self) -> usize {
        self.state
            .lock()
            .jobs
            .iter()
            .filter(|job| job.status == JobStatus::Queued)
            .count()
    }

    pub fn processing_count(&self) -> usize {
        self.state
            .lock()
            .jobs
            .iter()
            .filter(|job| job.status == JobStatus::Processing)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::options::OptionSet;

    fn job(tag: &str) -> Job {
        Job {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            prompt: format!("prompt {tag}"),
            summary: tag.to_string(),
            options: OptionSet::default(),
            status: JobStatus::Queued,
            retry_count: 0,
        }
    }

    fn queue_with(tags: &[&str]) -> (JobQueue, Vec<Uuid>) {
        let queue = JobQueue::new();
        let jobs: Vec<Job> = tags.iter().map(|t| job(t)).collect();
        let ids = jobs.iter().map(|j| j.id).collect();
        queue.enqueue(jobs);
        (queue, ids)
    }

    #[test]
    fn dequeue_follows_strict_head_first_order() {
        let (queue, ids) = queue_with(&["a", "b", "c"]);
        assert_eq!(queue.dequeue_next_eligible().unwrap().id, ids[0]);
        assert_eq!(queue.dequeue_next_eligible().unwrap().id, ids[1]);
        assert_eq!(queue.dequeue_next_eligible().unwrap().id, ids[2]);
        assert!(queue.dequeue_next_eligible().is_none());
    }

    #[test]
    fn dequeued_job_stays_a_member_until_finished() {
        let (queue, _) = queue_with(&["a"]);
        let job = queue.dequeue_next_eligible().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.processing_count(), 1);
        assert_eq!(queue.finish(job.id), FinishOutcome::Record);
        assert!(queue.is_empty());
    }

    #[test]
    fn to_top_then_dequeue_returns_that_job_first() {
        let (queue, ids) = queue_with(&["a", "b", "c", "d"]);
        assert!(queue.reorder(ids[3], Reorder::ToTop));
        assert_eq!(queue.dequeue_next_eligible().unwrap().id, ids[3]);
    }

    #[test]
    fn reorder_is_clamped_at_boundaries() {
        let (queue, ids) = queue_with(&["a", "b"]);
        assert!(queue.reorder(ids[0], Reorder::Up));
        assert!(queue.reorder(ids[1], Reorder::ToBottom));
        let order: Vec<Uuid> = queue.snapshot().iter().map(|j| j.id).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn reorder_moves_single_positions() {
        let (queue, ids) = queue_with(&["a", "b", "c"]);
        assert!(queue.reorder(ids[2], Reorder::Up));
        let order: Vec<Uuid> = queue.snapshot().iter().map(|j| j.id).collect();
        assert_eq!(order, vec![ids[0], ids[2], ids[1]]);
    }

    #[test]
    fn reorder_unknown_id_reports_false() {
        let (queue, _) = queue_with(&["a"]);
        assert!(!queue.reorder(Uuid::new_v4(), Reorder::Up));
    }

    #[test]
    fn promote_splices_to_front_preserving_relative_order() {
        let (queue, ids) = queue_with(&["a", "b", "c", "d", "e"]);
        queue.promote(&[ids[1], ids[3]]);
        let order: Vec<Uuid> = queue.snapshot().iter().map(|j| j.id).collect();
        assert_eq!(order, vec![ids[1], ids[3], ids[0], ids[2], ids[4]]);
    }

    #[test]
    fn remove_queued_job_deletes_immediately() {
        let (queue, ids) = queue_with(&["a", "b"]);
        assert_eq!(queue.remove(ids[0]), RemoveOutcome::Removed);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn remove_processing_job_defers_to_resolution() {
        let (queue, _) = queue_with(&["a"]);
        let job = queue.dequeue_next_eligible().unwrap();

        assert_eq!(queue.remove(job.id), RemoveOutcome::DeferredToResolve);
        // Still occupying its slot until the in-flight call resolves.
        assert_eq!(queue.processing_count(), 1);

        assert_eq!(queue.finish(job.id), FinishOutcome::Discard);
        assert!(queue.is_empty());
    }

    #[test]
    fn remove_unknown_id_reports_not_found() {
        let (queue, _) = queue_with(&["a"]);
        assert_eq!(queue.remove(Uuid::new_v4()), RemoveOutcome::NotFound);
    }

    #[test]
    fn clear_queued_spares_in_flight_jobs() {
        let (queue, _) = queue_with(&["a", "b", "c"]);
        let in_flight = queue.dequeue_next_eligible().unwrap();
        queue.clear_queued();
        let remaining = queue.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, in_flight.id);
    }
}
