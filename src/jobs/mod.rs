// src/jobs/mod.rs
//! Background execution of media batches.
//!
//! A job runs `generate_media_for_script` on a worker task. The number of
//! jobs running at once is bounded by a semaphore; the rest wait `queued`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use uuid::Uuid;

use crate::models::{MediaBatchReport, MediaKind, MediaParams};
use crate::workflow::WorkflowCoordinator;

/// Unique identifier for a background job
pub type JobId = Uuid;

/// Job status representing the current state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a free worker
    Queued,
    /// Job is currently running
    Running,
    /// Batch finished; individual scenes may still have failed
    Completed { report: MediaBatchReport },
    /// Batch could not run (script missing, locked, store down)
    Failed { error: String },
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub script_id: Uuid,
    pub kind: MediaKind,
    pub params: MediaParams,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub status: JobStatus,
}

impl Job {
    pub fn new(script_id: Uuid, kind: MediaKind, params: MediaParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            script_id,
            kind,
            params,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            status: JobStatus::Queued,
        }
    }
}

/// Job manager handles background job execution and state
pub struct JobManager {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
    workers: Arc<Semaphore>,
}

impl JobManager {
    pub fn new(max_concurrent_jobs: usize) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            workers: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Record a media job and start it in the background.
    pub async fn enqueue_media_job(
        self: &Arc<Self>,
        coordinator: Arc<WorkflowCoordinator>,
        script_id: Uuid,
        kind: MediaKind,
        params: MediaParams,
    ) -> Job {
        let job = Job::new(script_id, kind, params);
        let job_id = job.id;
        self.jobs.write().await.insert(job_id, job.clone());
        tracing::info!("🎬 Created {} job {} for script {}", kind, job_id, script_id);

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.run_media_job(coordinator, job_id).await;
        });

        job
    }

    async fn run_media_job(&self, coordinator: Arc<WorkflowCoordinator>, job_id: JobId) {
        let _permit = match Arc::clone(&self.workers).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                self.update_job_status(job_id, JobStatus::Failed { error: e.to_string() })
                    .await;
                return;
            }
        };

        let Some(job) = self.get_job(job_id).await else {
            return;
        };
        self.update_job_status(job_id, JobStatus::Running).await;

        let status = match coordinator
            .generate_media_for_script(job.script_id, job.kind, &job.params)
            .await
        {
            Ok(report) => JobStatus::Completed { report },
            Err(e) => {
                tracing::error!("❌ Job {} failed: {}", job_id, e);
                JobStatus::Failed { error: e.to_string() }
            }
        };
        self.update_job_status(job_id, status).await;
    }

    /// Get job details
    pub async fn get_job(&self, job_id: JobId) -> Option<Job> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// Jobs for a script, newest first
    pub async fn jobs_for_script(&self, script_id: Uuid) -> Vec<Job> {
        let jobs = self.jobs.read().await;
        let mut found: Vec<Job> = jobs
            .values()
            .filter(|job| job.script_id == script_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    /// Update job status
    pub async fn update_job_status(&self, job_id: JobId, status: JobStatus) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            match &status {
                JobStatus::Running if job.started_at.is_none() => {
                    job.started_at = Some(Utc::now());
                }
                JobStatus::Completed { .. } | JobStatus::Failed { .. } => {
                    job.completed_at = Some(Utc::now());
                }
                _ => {}
            }
            tracing::debug!("📊 Updated job {} status: {:?}", job_id, status);
            job.status = status;
        }
    }

    /// Cleanup completed/failed jobs older than specified duration
    pub async fn cleanup_old_jobs(&self, max_age_hours: i64) -> usize {
        let mut jobs = self.jobs.write().await;
        let cutoff = Utc::now() - chrono::Duration::hours(max_age_hours);
        let before = jobs.len();

        jobs.retain(|job_id, job| {
            let expired = job.completed_at.is_some_and(|completed_at| completed_at < cutoff);
            if expired {
                tracing::debug!("🗑️ Cleaned up old job: {}", job_id);
            }
            !expired
        });

        before - jobs.len()
    }
}

/// Global job manager instance (to be stored in AppState)
pub type SharedJobManager = Arc<JobManager>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewScene, NewScript, ScriptStatus};
    use crate::store::{InMemoryStore, ScriptStore};
    use crate::workflow::testing::coordinator_with;
    use std::time::Duration;

    async fn wait_until_finished(manager: &JobManager, job_id: JobId) -> Job {
        for _ in 0..200 {
            if let Some(job) = manager.get_job(job_id).await {
                if job.status.is_finished() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish", job_id);
    }

    #[tokio::test]
    async fn media_job_runs_batch_in_background() {
        let store = Arc::new(InMemoryStore::new());
        let (coordinator, _) = coordinator_with(store.clone());
        let coordinator = Arc::new(coordinator);

        let script = store
            .create_script(NewScript {
                title: "t".into(),
                description: String::new(),
                target_audience: "all".into(),
                total_duration: 10,
                creator_id: None,
            })
            .await
            .unwrap();
        store
            .insert_scenes(
                script.id,
                &[NewScene {
                    scene_number: 1,
                    description: "only".into(),
                    duration: 10,
                    visual_elements: "a beach".into(),
                    background_music: None,
                    voice_over: Some("hello".into()),
                }],
            )
            .await
            .unwrap();

        let manager = Arc::new(JobManager::new(2));
        let job = manager
            .enqueue_media_job(coordinator, script.id, MediaKind::Image, MediaParams::default())
            .await;

        let finished = wait_until_finished(&manager, job.id).await;
        match finished.status {
            JobStatus::Completed { report } => {
                assert_eq!(report.script_status, ScriptStatus::Completed);
                assert_eq!(report.generated.len(), 1);
            }
            other => panic!("unexpected status {:?}", other),
        }
        assert!(finished.started_at.is_some());
        assert!(finished.completed_at.is_some());
        assert_eq!(manager.jobs_for_script(script.id).await.len(), 1);
    }

    #[tokio::test]
    async fn job_for_missing_script_fails() {
        let (coordinator, _) = coordinator_with(Arc::new(InMemoryStore::new()));
        let manager = Arc::new(JobManager::new(1));

        let job = manager
            .enqueue_media_job(
                Arc::new(coordinator),
                Uuid::new_v4(),
                MediaKind::Voice,
                MediaParams::default(),
            )
            .await;

        let finished = wait_until_finished(&manager, job.id).await;
        assert!(matches!(finished.status, JobStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn cleanup_removes_only_old_finished_jobs() {
        let manager = JobManager::new(1);
        let mut old = Job::new(Uuid::new_v4(), MediaKind::Image, MediaParams::default());
        old.status = JobStatus::Failed { error: "x".into() };
        old.completed_at = Some(Utc::now() - chrono::Duration::hours(48));
        let queued = Job::new(Uuid::new_v4(), MediaKind::Image, MediaParams::default());

        {
            let mut jobs = manager.jobs.write().await;
            jobs.insert(old.id, old.clone());
            jobs.insert(queued.id, queued.clone());
        }

        assert_eq!(manager.cleanup_old_jobs(24).await, 1);
        assert!(manager.get_job(old.id).await.is_none());
        assert!(manager.get_job(queued.id).await.is_some());
    }

    #[test]
    fn status_serializes_with_tag() {
        let json = serde_json::to_value(JobStatus::Failed { error: "boom".into() }).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
    }
}
