//! In-process job registry.
//!
//! The registry is the one piece of shared mutable state: the pipeline task
//! for a job writes its entry while status queries read concurrently. All
//! access goes through the registry lock; callers only ever see snapshots.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::job::{Job, JobStatus, PublishOutcome};
use crate::invoke::LogSink;

/// Shared registry mapping job ids to job state.
#[derive(Clone, Default)]
pub struct JobRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job, returning its id.
    pub async fn insert(&self, job: Job) -> Uuid {
        let id = job.id;
        self.inner.write().await.insert(id, job);
        id
    }

    /// Snapshot a job's current state.
    pub async fn snapshot(&self, id: &Uuid) -> Option<Job> {
        self.inner.read().await.get(id).cloned()
    }

    /// Number of tracked jobs.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Advance a job's status, returning whether the transition applied.
    pub async fn advance_status(&self, id: &Uuid, next: JobStatus) -> bool {
        let mut jobs = self.inner.write().await;
        jobs.get_mut(id).map(|job| job.advance(next)).unwrap_or(false)
    }

    /// Append a line to a job's progress log.
    pub async fn append_log(&self, id: &Uuid, line: impl Into<String>) {
        let mut jobs = self.inner.write().await;
        if let Some(job) = jobs.get_mut(id) {
            job.append_log(line);
        }
    }

    /// Finalize a job as succeeded.
    pub async fn finish_ok(&self, id: &Uuid, outcome: PublishOutcome) -> bool {
        let mut jobs = self.inner.write().await;
        jobs.get_mut(id)
            .map(|job| job.finish_ok(outcome))
            .unwrap_or(false)
    }

    /// Finalize a job as failed.
    pub async fn finish_err(
        &self,
        id: &Uuid,
        message: impl Into<String>,
        stderr: Option<String>,
    ) -> bool {
        let mut jobs = self.inner.write().await;
        jobs.get_mut(id)
            .map(|job| job.finish_err(message, stderr))
            .unwrap_or(false)
    }

    /// Evict terminal jobs whose retention TTL has elapsed, returning how
    /// many were removed. Running jobs are never evicted.
    pub async fn evict_expired(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let cutoff = Utc::now() - ttl;
        let mut jobs = self.inner.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| {
            !job.status.is_terminal()
                || job.finished_at.map(|at| at > cutoff).unwrap_or(true)
        });
        before - jobs.len()
    }
}

/// Log sink bound to one registry entry.
pub struct JobLogger {
    registry: JobRegistry,
    id: Uuid,
}

impl JobLogger {
    pub fn new(registry: JobRegistry, id: Uuid) -> Self {
        Self { registry, id }
    }

    pub async fn append(&self, line: impl Into<String>) {
        self.registry.append_log(&self.id, line).await;
    }
}

#[async_trait]
impl LogSink for JobLogger {
    async fn append(&self, line: String) {
        self.registry.append_log(&self.id, line).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::Network;

    fn sample_outcome() -> PublishOutcome {
        PublishOutcome {
            tx_hash: "0xabc".to_string(),
            addresses: vec![],
            modules: vec![],
            network: Network::Devnet,
            explorer_url: Network::Devnet.explorer_url("0xabc"),
        }
    }

    #[tokio::test]
    async fn test_insert_and_snapshot() {
        let registry = JobRegistry::new();
        let id = registry.insert(Job::new("digest".to_string())).await;

        let snapshot = registry.snapshot(&id).await.expect("job exists");
        assert_eq!(snapshot.id, id);
        assert_eq!(snapshot.status, JobStatus::Pending);

        assert!(registry.snapshot(&Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_advance_rejects_regressions() {
        let registry = JobRegistry::new();
        let id = registry.insert(Job::new("digest".to_string())).await;

        assert!(registry.advance_status(&id, JobStatus::Compiling).await);
        assert!(!registry.advance_status(&id, JobStatus::Extracting).await);

        let snapshot = registry.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Compiling);
    }

    #[tokio::test]
    async fn test_finish_is_exclusive() {
        let registry = JobRegistry::new();
        let id = registry.insert(Job::new("digest".to_string())).await;

        assert!(registry.finish_ok(&id, sample_outcome()).await);
        assert!(!registry.finish_err(&id, "too late", None).await);

        let snapshot = registry.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Succeeded);
        assert!(snapshot.result.is_some());
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_job_logger_appends_in_order() {
        let registry = JobRegistry::new();
        let id = registry.insert(Job::new("digest".to_string())).await;
        let logger = JobLogger::new(registry.clone(), id);

        logger.append("one").await;
        logger.append("two").await;

        let snapshot = registry.snapshot(&id).await.unwrap();
        let lines: Vec<&str> = snapshot.log.iter().map(|l| l.line.as_str()).collect();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_evict_expired_only_removes_old_terminal_jobs() {
        let registry = JobRegistry::new();
        let running = registry.insert(Job::new("a".to_string())).await;
        let finished = registry.insert(Job::new("b".to_string())).await;
        registry.finish_err(&finished, "done", None).await;

        // Nothing is old enough yet.
        assert_eq!(registry.evict_expired(Duration::from_secs(3600)).await, 0);

        // Zero TTL expires every terminal job, but never running ones.
        assert_eq!(registry.evict_expired(Duration::ZERO).await, 1);
        assert!(registry.snapshot(&running).await.is_some());
        assert!(registry.snapshot(&finished).await.is_none());
    }
}
