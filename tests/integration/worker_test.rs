use crate::helpers::{
    api_response, checkin,
    mock_api::MockUntappdApi,
    mock_repo::{MockCursorRepository, MockJobRepository},
    mock_store::MockContentStore,
    page_body,
};
use chrono::Utc;
use serde_json::json;
use slurprs::domain::models::checkin::{BatchSource, Checkin};
use slurprs::domain::models::job::{Job, JobKind, JobPayload, JobStatus, MaintenanceKind};
use slurprs::domain::repositories::job_repository::JobRepository;
use slurprs::infrastructure::cache::cache_store::MemoryCacheStore;
use slurprs::queue::action_queue::ActionQueue;
use slurprs::queue::batch::BatchScheduler;
use slurprs::queue::budget::ApiBudget;
use slurprs::walker::importer::Importer;
use slurprs::walker::sync_status::SyncStatusTracker;
use slurprs::workers::checkin_worker::CheckinWorker;
use slurprs::workers::worker::Worker;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    api: Arc<MockUntappdApi>,
    repo: Arc<MockJobRepository>,
    store: Arc<MockContentStore>,
    budget: Arc<ApiBudget>,
    worker: CheckinWorker,
}

fn fixture_with(store: MockContentStore, ceiling: u32) -> Fixture {
    let api = Arc::new(MockUntappdApi::new());
    let repo = Arc::new(MockJobRepository::new());
    let store = Arc::new(store);
    let cache = Arc::new(MemoryCacheStore::new());
    let budget = Arc::new(ApiBudget::new(cache.clone(), ceiling));
    let queue = Arc::new(ActionQueue::new(repo.clone()));
    let batch = Arc::new(BatchScheduler::new(
        queue.clone(),
        budget.clone(),
        store.clone(),
        4,
    ));
    let importer = Arc::new(Importer::new(
        api.clone(),
        batch,
        budget.clone(),
        Arc::new(MockCursorRepository::new()),
        store.clone(),
        queue.clone(),
        SyncStatusTracker::new(cache),
    ));

    let worker = CheckinWorker::new(
        repo.clone(),
        budget.clone(),
        store.clone(),
        api.clone(),
        queue,
        importer,
        4,
        2,
        Duration::from_millis(10),
    );

    Fixture {
        api,
        repo,
        store,
        budget,
        worker,
    }
}

fn fixture() -> Fixture {
    fixture_with(MockContentStore::new(), 90)
}

async fn enqueue(repo: &MockJobRepository, payload: JobPayload) -> Job {
    let job = Job::new(payload.kind(), payload.to_value(), Utc::now().into());
    repo.create(&job).await.unwrap()
}

fn tagged_checkin(id: i64) -> Checkin {
    serde_json::from_value(json!({
        "checkin_id": id,
        "tagged_friends": { "items": [{ "user_name": "buddy" }] }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_process_checkin_stores_and_consumes_budget() {
    let f = fixture();
    let job = enqueue(
        &f.repo,
        JobPayload::ProcessCheckin {
            checkin: checkin(7),
            source: BatchSource::ImportNew,
        },
    )
    .await;

    assert!(f.worker.run_once().await.unwrap());

    assert_eq!(
        f.store.inserted(),
        vec![(7, BatchSource::ImportNew)]
    );
    assert_eq!(f.budget.remaining().await.unwrap(), 86);

    let done = f.repo.jobs().into_iter().find(|j| j.id == job.id).unwrap();
    assert_eq!(done.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_process_checkin_with_friends_schedules_backfill() {
    let f = fixture();
    enqueue(
        &f.repo,
        JobPayload::ProcessCheckin {
            checkin: tagged_checkin(7),
            source: BatchSource::ImportNew,
        },
    )
    .await;

    f.worker.run_once().await.unwrap();

    let backfills = f.repo.jobs_of_kind(JobKind::BackfillCompanion);
    assert_eq!(backfills.len(), 1);

    let decoded =
        JobPayload::from_value(JobKind::BackfillCompanion, &backfills[0].payload).unwrap();
    assert_eq!(
        decoded,
        JobPayload::BackfillCompanion {
            checkin_id: 7,
            post_id: 7
        }
    );
}

#[tokio::test]
async fn test_process_checkin_defers_when_budget_is_short() {
    // 3 units left, a 4-unit checkin cannot run in this window
    let f = fixture_with(MockContentStore::new(), 3);
    let job = enqueue(
        &f.repo,
        JobPayload::ProcessCheckin {
            checkin: checkin(7),
            source: BatchSource::ImportOld,
        },
    )
    .await;

    f.worker.run_once().await.unwrap();

    // Nothing was stored, the original completed, and a twin waits a window out
    assert!(f.store.inserted().is_empty());

    let jobs = f.repo.jobs_of_kind(JobKind::ProcessCheckin);
    assert_eq!(jobs.len(), 2);

    let original = jobs.iter().find(|j| j.id == job.id).unwrap();
    assert_eq!(original.status, JobStatus::Completed);

    let deferred = jobs.iter().find(|j| j.id != job.id).unwrap();
    assert_eq!(deferred.status, JobStatus::Pending);
    let delay = (deferred.scheduled_at.with_timezone(&Utc) - Utc::now()).num_seconds();
    assert!((3595..=3600).contains(&delay));
}

#[tokio::test]
async fn test_duplicate_checkin_counts_as_success() {
    let f = fixture_with(MockContentStore::with_existing(&[7]), 90);
    let job = enqueue(
        &f.repo,
        JobPayload::ProcessCheckin {
            checkin: checkin(7),
            source: BatchSource::ImportOld,
        },
    )
    .await;

    f.worker.run_once().await.unwrap();

    let done = f.repo.jobs().into_iter().find(|j| j.id == job.id).unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert!(f.store.inserted().is_empty());
}

#[tokio::test]
async fn test_companion_backfill_attaches_detail() {
    let f = fixture();
    f.api.push_detail(Ok(api_response(
        json!({ "response": { "checkin": { "tagged_friends": { "items": [] } } } }),
        Some(70),
    )));

    enqueue(
        &f.repo,
        JobPayload::BackfillCompanion {
            checkin_id: 7,
            post_id: 7,
        },
    )
    .await;

    f.worker.run_once().await.unwrap();

    assert_eq!(f.api.detail_calls(), vec![7]);
    assert_eq!(f.store.companions_attached(), vec![(7, 7)]);
    // 2 units consumed, then resynced to the provider's view
    assert_eq!(f.budget.remaining().await.unwrap(), 70);
}

#[tokio::test]
async fn test_companion_backfill_missing_detail_is_silent_noop() {
    let f = fixture();
    // No scripted detail: the fetch fails

    let job = enqueue(
        &f.repo,
        JobPayload::BackfillCompanion {
            checkin_id: 7,
            post_id: 7,
        },
    )
    .await;

    f.worker.run_once().await.unwrap();

    assert!(f.store.companions_attached().is_empty());
    let done = f.repo.jobs().into_iter().find(|j| j.id == job.id).unwrap();
    assert_eq!(done.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_daily_maintenance_fans_out_staggered_tasks() {
    let f = fixture();
    enqueue(&f.repo, JobPayload::DailyMaintenance {}).await;

    f.worker.run_once().await.unwrap();

    let tasks = f.repo.jobs_of_kind(JobKind::MaintenanceTask);
    assert_eq!(tasks.len(), 4);

    let mut delays: Vec<i64> = tasks
        .iter()
        .map(|j| (j.scheduled_at.with_timezone(&Utc) - Utc::now()).num_seconds())
        .collect();
    delays.sort_unstable();

    assert!(delays[0] <= 0);
    assert!((55..=60).contains(&delays[1]));
    assert!((115..=120).contains(&delays[2]));
    assert!((175..=180).contains(&delays[3]));
}

#[tokio::test]
async fn test_maintenance_task_runs_against_store() {
    let f = fixture();
    enqueue(
        &f.repo,
        JobPayload::MaintenanceTask {
            task: MaintenanceKind::Stats,
        },
    )
    .await;

    f.worker.run_once().await.unwrap();

    assert_eq!(f.store.maintenance_runs(), vec![MaintenanceKind::Stats]);
    assert_eq!(f.budget.remaining().await.unwrap(), 89);
}

#[tokio::test]
async fn test_maintenance_task_defers_without_budget() {
    let f = fixture_with(MockContentStore::new(), 0);
    enqueue(
        &f.repo,
        JobPayload::MaintenanceTask {
            task: MaintenanceKind::BreweryBackfill,
        },
    )
    .await;

    f.worker.run_once().await.unwrap();

    assert!(f.store.maintenance_runs().is_empty());

    let tasks = f.repo.jobs_of_kind(JobKind::MaintenanceTask);
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().any(|j| j.status == JobStatus::Pending));
}

#[tokio::test]
async fn test_undecodable_payload_fails_the_job() {
    let f = fixture();
    let job = Job::new(
        JobKind::BackfillCompanion,
        json!({ "wrong": "shape" }),
        Utc::now().into(),
    );
    f.repo.create(&job).await.unwrap();

    f.worker.run_once().await.unwrap();

    let failed = f.repo.jobs().into_iter().find(|j| j.id == job.id).unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_recurring_import_reschedules_next_occurrence() {
    let f = fixture();
    // Short empty page: the import completes with nothing to do
    f.api
        .push_response(Ok(api_response(page_body(&[], None, None), None)));

    let job = Job::recurring(
        JobKind::HourlyImport,
        JobPayload::HourlyImport {
            user: "kraft".to_string(),
        }
        .to_value(),
        3600,
    );
    f.repo.create(&job).await.unwrap();

    f.worker.run_once().await.unwrap();

    let imports = f.repo.jobs_of_kind(JobKind::HourlyImport);
    assert_eq!(imports.len(), 2);

    let next = imports.iter().find(|j| j.id != job.id).unwrap();
    assert!(next.recurring);
    assert_eq!(next.status, JobStatus::Pending);
    let delay = (next.scheduled_at.with_timezone(&Utc) - Utc::now()).num_seconds();
    assert!((3595..=3600).contains(&delay));
}

#[tokio::test]
async fn test_run_once_without_due_jobs() {
    let f = fixture();
    assert!(!f.worker.run_once().await.unwrap());
}

#[tokio::test]
async fn test_worker_reports_its_name() {
    let f = fixture();
    let worker: &dyn Worker = &f.worker;
    assert_eq!(worker.name(), "checkin_worker");
}
