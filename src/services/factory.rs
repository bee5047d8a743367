use uuid::Uuid;

use crate::models::job::{Job, JobStatus, SourceRecord};
use crate::models::options::OptionSet;
use crate::services::{permutation, prompt};

/// Build one job per combination for a single source input.
///
/// The option set is snapshotted by value: later edits to the live
/// configuration never alter jobs that already exist. Every job of the batch
/// shares the same source reference and snapshot.
pub fn create_jobs(source: &SourceRecord, options: &OptionSet) -> Result<Vec<Job>, FactoryError> {
    let snapshot = options.clone();
    let combinations = permutation::expand(&snapshot);

    // The empty-axis rule guarantees at least one combination; zero means
    // the expansion itself is broken, not that the user selected nothing.
    if combinations.is_empty() {
        return Err(FactoryError::EmptyExpansion {
            source_id: source.id,
        });
    }

    let jobs = combinations
        .iter()
        .map(|combination| {
            let composed = prompt::compose(combination);
            Job {
                id: Uuid::new_v4(),
                source_id: source.id,
                prompt: composed.instruction,
                summary: composed.summary,
                options: snapshot.clone(),
                status: JobStatus::Queued,
                retry_count: 0,
            }
        })
        .collect();

    Ok(jobs)
}

#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("option expansion produced zero combinations for source {source_id}")]
    EmptyExpansion { source_id: Uuid },
}
