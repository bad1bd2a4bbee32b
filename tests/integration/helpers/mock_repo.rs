use async_trait::async_trait;
use chrono::Utc;
use slurprs::domain::models::cursor::ImportCursor;
use slurprs::domain::models::job::{Job, JobKind, JobStatus};
use slurprs::domain::repositories::cursor_repository::CursorRepository;
use slurprs::domain::repositories::job_repository::{JobRepository, RepositoryError};
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory job repository for integration tests
pub struct MockJobRepository {
    jobs: Mutex<Vec<Job>>,
}

impl MockJobRepository {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every job the repository has seen
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn jobs_of_kind(&self, kind: JobKind) -> Vec<Job> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.kind == kind)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl JobRepository for MockJobRepository {
    async fn create(&self, job: &Job) -> Result<Job, RepositoryError> {
        self.jobs.lock().unwrap().push(job.clone());
        Ok(job.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == id)
            .cloned())
    }

    async fn update(&self, job: &Job) -> Result<Job, RepositoryError> {
        let mut jobs = self.jobs.lock().unwrap();
        let existing = jobs
            .iter_mut()
            .find(|j| j.id == job.id)
            .ok_or(RepositoryError::NotFound)?;
        *existing = job.clone();
        Ok(job.clone())
    }

    async fn find_pending(
        &self,
        kind: JobKind,
        payload: &serde_json::Value,
    ) -> Result<Option<Job>, RepositoryError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.kind == kind && j.status == JobStatus::Pending && &j.payload == payload)
            .cloned())
    }

    async fn find_live(
        &self,
        kind: JobKind,
        payload: &serde_json::Value,
    ) -> Result<Option<Job>, RepositoryError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| {
                j.kind == kind
                    && matches!(j.status, JobStatus::Pending | JobStatus::Running)
                    && &j.payload == payload
            })
            .cloned())
    }

    async fn acquire_next(&self, worker_id: Uuid) -> Result<Option<Job>, RepositoryError> {
        let mut jobs = self.jobs.lock().unwrap();
        let now = Utc::now();

        let mut due: Vec<&mut Job> = jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending && j.scheduled_at <= now)
            .collect();
        due.sort_by_key(|j| j.scheduled_at);

        if let Some(job) = due.into_iter().next() {
            job.status = JobStatus::Running;
            job.lock_token = Some(worker_id);
            job.lock_expires_at = Some((now + chrono::Duration::minutes(5)).into());
            job.started_at = Some(now.into());
            return Ok(Some(job.clone()));
        }
        Ok(None)
    }

    async fn mark_completed(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(RepositoryError::NotFound)?;
        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now().into());
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(RepositoryError::NotFound)?;
        job.status = JobStatus::Failed;
        job.completed_at = Some(Utc::now().into());
        Ok(())
    }

    async fn reset_stuck_jobs(&self, _timeout: chrono::Duration) -> Result<u64, RepositoryError> {
        let mut jobs = self.jobs.lock().unwrap();
        let now = Utc::now();
        let mut reset = 0u64;

        for job in jobs.iter_mut() {
            let expired = job
                .lock_expires_at
                .map(|e| e <= now)
                .unwrap_or(false);
            if job.status == JobStatus::Running && expired {
                job.status = JobStatus::Pending;
                job.lock_token = None;
                job.lock_expires_at = None;
                reset += 1;
            }
        }
        Ok(reset)
    }

    async fn cancel_by_kind(&self, kind: JobKind) -> Result<u64, RepositoryError> {
        let mut jobs = self.jobs.lock().unwrap();
        let mut cancelled = 0u64;
        for job in jobs.iter_mut() {
            if job.kind == kind && matches!(job.status, JobStatus::Pending | JobStatus::Running) {
                job.status = JobStatus::Cancelled;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    async fn cancel_group(&self, group_tag: &str) -> Result<u64, RepositoryError> {
        let mut jobs = self.jobs.lock().unwrap();
        let mut cancelled = 0u64;
        for job in jobs.iter_mut() {
            if job.group_tag == group_tag
                && matches!(job.status, JobStatus::Pending | JobStatus::Running)
            {
                job.status = JobStatus::Cancelled;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    async fn count_pending(&self, group_tag: &str) -> Result<u64, RepositoryError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.group_tag == group_tag && j.status == JobStatus::Pending)
            .count() as u64)
    }
}

/// In-memory cursor repository for integration tests
pub struct MockCursorRepository {
    cursors: Mutex<Vec<ImportCursor>>,
}

impl MockCursorRepository {
    pub fn new() -> Self {
        Self {
            cursors: Mutex::new(Vec::new()),
        }
    }

    pub fn with_cursor(cursor: ImportCursor) -> Self {
        Self {
            cursors: Mutex::new(vec![cursor]),
        }
    }

    pub fn cursor(&self, username: &str) -> Option<ImportCursor> {
        self.cursors
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.username == username)
            .cloned()
    }
}

#[async_trait]
impl CursorRepository for MockCursorRepository {
    async fn find_by_user(&self, username: &str) -> Result<Option<ImportCursor>, RepositoryError> {
        Ok(self.cursor(username))
    }

    async fn save(&self, cursor: &ImportCursor) -> Result<ImportCursor, RepositoryError> {
        let mut cursors = self.cursors.lock().unwrap();
        if let Some(existing) = cursors.iter_mut().find(|c| c.username == cursor.username) {
            *existing = cursor.clone();
        } else {
            cursors.push(cursor.clone());
        }
        Ok(cursor.clone())
    }

    async fn delete(&self, username: &str) -> Result<(), RepositoryError> {
        self.cursors
            .lock()
            .unwrap()
            .retain(|c| c.username != username);
        Ok(())
    }
}
