use crate::helpers::{checkin, mock_repo::MockJobRepository, mock_store::MockContentStore};
use chrono::{Duration, Utc};
use slurprs::domain::models::checkin::BatchSource;
use slurprs::domain::models::job::{JobKind, JobPayload, JobStatus};
use slurprs::domain::repositories::job_repository::JobRepository;
use slurprs::infrastructure::cache::cache_store::MemoryCacheStore;
use slurprs::queue::action_queue::ActionQueue;
use slurprs::queue::batch::BatchScheduler;
use slurprs::queue::budget::ApiBudget;
use std::sync::Arc;
use uuid::Uuid;

fn payload(user: &str) -> JobPayload {
    JobPayload::HourlyImport {
        user: user.to_string(),
    }
}

#[tokio::test]
async fn test_schedule_dedups_against_pending_only() {
    let repo = Arc::new(MockJobRepository::new());
    let queue = ActionQueue::new(repo.clone());

    let first = queue.schedule(&payload("kraft"), Duration::zero()).await.unwrap();
    assert!(first.is_some());

    // Identical pending job blocks a second schedule
    let second = queue.schedule(&payload("kraft"), Duration::zero()).await.unwrap();
    assert!(second.is_none());

    // Different payload is not deduped
    let other = queue.schedule(&payload("other"), Duration::zero()).await.unwrap();
    assert!(other.is_some());

    // Once the job is running it no longer blocks re-queueing
    let acquired = repo.acquire_next(Uuid::new_v4()).await.unwrap().unwrap();
    assert_eq!(acquired.status, JobStatus::Running);

    let requeued = queue.schedule(&payload("kraft"), Duration::zero()).await.unwrap();
    assert!(requeued.is_some());
}

#[tokio::test]
async fn test_schedule_recurring_dedups_against_live_jobs() {
    let repo = Arc::new(MockJobRepository::new());
    let queue = ActionQueue::new(repo.clone());

    assert!(queue
        .schedule_recurring(&payload("kraft"), 3600)
        .await
        .unwrap()
        .is_some());

    // Pending twin blocks
    assert!(queue
        .schedule_recurring(&payload("kraft"), 3600)
        .await
        .unwrap()
        .is_none());

    // Running twin blocks too
    repo.acquire_next(Uuid::new_v4()).await.unwrap().unwrap();
    assert!(queue
        .schedule_recurring(&payload("kraft"), 3600)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_next_scheduled_reports_pending_time() {
    let repo = Arc::new(MockJobRepository::new());
    let queue = ActionQueue::new(repo);

    assert!(queue.next_scheduled(&payload("kraft")).await.unwrap().is_none());

    queue
        .schedule(&payload("kraft"), Duration::seconds(300))
        .await
        .unwrap();

    let at = queue.next_scheduled(&payload("kraft")).await.unwrap().unwrap();
    let delta = (at.with_timezone(&Utc) - Utc::now()).num_seconds();
    assert!((295..=305).contains(&delta));
}

#[tokio::test]
async fn test_cancel_all_and_cleanup() {
    let repo = Arc::new(MockJobRepository::new());
    let queue = ActionQueue::new(repo.clone());

    queue.schedule(&payload("a"), Duration::zero()).await.unwrap();
    queue.schedule(&payload("b"), Duration::zero()).await.unwrap();
    queue
        .schedule(&JobPayload::DailyMaintenance {}, Duration::zero())
        .await
        .unwrap();

    assert_eq!(queue.cancel_all(JobKind::HourlyImport).await.unwrap(), 2);
    assert_eq!(queue.cleanup().await.unwrap(), 1);
    assert_eq!(repo.count_pending("slurprs").await.unwrap(), 0);
}

#[tokio::test]
async fn test_queue_batch_staggers_within_budget() {
    let repo = Arc::new(MockJobRepository::new());
    let queue = Arc::new(ActionQueue::new(repo.clone()));
    let budget = Arc::new(ApiBudget::new(Arc::new(MemoryCacheStore::new()), 90));
    let store = Arc::new(MockContentStore::new());
    let batch = BatchScheduler::new(queue, budget, store, 4);

    let checkins = vec![checkin(1), checkin(2), checkin(3)];
    let queued = batch
        .queue_batch(&checkins, BatchSource::ImportNew)
        .await
        .unwrap();
    assert_eq!(queued, 3);

    let mut delays: Vec<i64> = repo
        .jobs()
        .iter()
        .map(|j| (j.scheduled_at.with_timezone(&Utc) - Utc::now()).num_seconds())
        .collect();
    delays.sort_unstable();

    // 0s, 2s, 4s stagger, allow a little slack for test runtime
    assert!(delays[0] <= 0);
    assert!((1..=2).contains(&delays[1]));
    assert!((3..=4).contains(&delays[2]));
}

#[tokio::test]
async fn test_queue_batch_overflow_jumps_once_to_next_window() {
    let repo = Arc::new(MockJobRepository::new());
    let queue = Arc::new(ActionQueue::new(repo.clone()));
    let budget = Arc::new(ApiBudget::new(Arc::new(MemoryCacheStore::new()), 90));
    let store = Arc::new(MockContentStore::new());

    // 3 units left, buffer 2 leaves 1 usable: the very first 4-unit
    // checkin overflows and the whole batch lands in the next window
    budget.consume(87).await.unwrap();
    let batch = BatchScheduler::new(queue, budget, store, 4);

    let checkins = vec![checkin(1), checkin(2)];
    let queued = batch
        .queue_batch(&checkins, BatchSource::ImportOld)
        .await
        .unwrap();
    assert_eq!(queued, 2);

    let mut delays: Vec<i64> = repo
        .jobs()
        .iter()
        .map(|j| (j.scheduled_at.with_timezone(&Utc) - Utc::now()).num_seconds())
        .collect();
    delays.sort_unstable();

    // Single jump to +3600, then the stagger keeps accruing
    assert!((3595..=3600).contains(&delays[0]));
    assert!((3597..=3602).contains(&delays[1]));
}

#[tokio::test]
async fn test_queue_batch_skips_stored_and_deduped_checkins() {
    let repo = Arc::new(MockJobRepository::new());
    let queue = Arc::new(ActionQueue::new(repo.clone()));
    let budget = Arc::new(ApiBudget::new(Arc::new(MemoryCacheStore::new()), 90));
    let store = Arc::new(MockContentStore::with_existing(&[1]));
    let batch = BatchScheduler::new(queue.clone(), budget, store, 4);

    // A pending twin for checkin 2 already sits in the queue
    let twin = JobPayload::ProcessCheckin {
        checkin: checkin(2),
        source: BatchSource::ImportOld,
    };
    queue.schedule(&twin, Duration::zero()).await.unwrap();

    let checkins = vec![checkin(1), checkin(2), checkin(3)];
    let queued = batch
        .queue_batch(&checkins, BatchSource::ImportOld)
        .await
        .unwrap();

    // 1 is already stored, 2 dedups, only 3 creates a job
    assert_eq!(queued, 1);
    assert_eq!(repo.jobs_of_kind(JobKind::ProcessCheckin).len(), 2);
}
