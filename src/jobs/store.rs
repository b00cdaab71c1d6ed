use super::types::{Job, JobSummary};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("job {0} already exists")]
    Duplicate(String),

    #[error("job store failure: {0}")]
    Backend(String),
}

/// Persistence contract for jobs. Durability is best effort and
/// backend-owned; callers treat the store as a record keeper, not a
/// transaction log.
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job. Used only by the finalization pipeline.
    async fn insert(&self, job: Job) -> Result<(), StoreError>;

    /// Summaries of all jobs, newest first.
    async fn list(&self) -> Result<Vec<JobSummary>, StoreError>;

    /// Full detail including instructions and artifact refs.
    async fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError>;

    /// Delete a job whole. Returns false when the job does not exist.
    async fn delete(&self, job_id: &str) -> Result<bool, StoreError>;
}

/// In-memory reference implementation.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.job_id) {
            return Err(StoreError::Duplicate(job.job_id));
        }
        jobs.insert(job.job_id.clone(), job);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<JobSummary>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut summaries: Vec<JobSummary> = jobs.values().map(Job::summary).collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(job_id).cloned())
    }

    async fn delete(&self, job_id: &str) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.write().await;
        Ok(jobs.remove(job_id).is_some())
    }
}
