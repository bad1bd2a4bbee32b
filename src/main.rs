// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use slurprs::config::settings::Settings;
use slurprs::domain::repositories::cursor_repository::CursorRepository;
use slurprs::domain::repositories::job_repository::JobRepository;
use slurprs::domain::services::content_store::ContentStore;
use slurprs::domain::services::untappd_api::UntappdApi;
use slurprs::infrastructure::cache::cache_store::{CacheStore, RedisCacheStore};
use slurprs::infrastructure::cache::redis_client::RedisClient;
use slurprs::infrastructure::database::connection;
use slurprs::infrastructure::observability::metrics;
use slurprs::infrastructure::repositories::cursor_repo_impl::CursorRepositoryImpl;
use slurprs::infrastructure::repositories::job_repo_impl::JobRepositoryImpl;
use slurprs::infrastructure::services::content_store_impl::DbContentStore;
use slurprs::infrastructure::services::untappd_client::UntappdClient;
use slurprs::queue::action_queue::ActionQueue;
use slurprs::queue::batch::BatchScheduler;
use slurprs::queue::budget::ApiBudget;
use slurprs::utils::telemetry;
use slurprs::walker::importer::Importer;
use slurprs::walker::sync_status::SyncStatusTracker;
use slurprs::workers::manager::WorkerManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use migration::{Migrator, MigratorTrait};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting slurprs...");

    // Initialize Prometheus Metrics
    metrics::init_metrics();

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    let db = Arc::new(db);
    info!("Database connection established");

    // Run database migrations
    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. Initialize Redis-backed shared cache
    let redis_client = RedisClient::new(&settings.redis.url).await?;
    let cache: Arc<dyn CacheStore> = Arc::new(RedisCacheStore::new(redis_client));
    info!("Shared cache initialized");

    // 5. Initialize components
    let job_repo: Arc<dyn JobRepository> = Arc::new(JobRepositoryImpl::new(db.clone()));
    let cursor_repo: Arc<dyn CursorRepository> = Arc::new(CursorRepositoryImpl::new(db.clone()));
    let store: Arc<dyn ContentStore> = Arc::new(DbContentStore::new(db.clone()));
    let api: Arc<dyn UntappdApi> = Arc::new(UntappdClient::new(&settings.untappd));

    let budget = Arc::new(ApiBudget::new(
        cache.clone(),
        settings.untappd.budget_per_hour,
    ));
    let queue = Arc::new(ActionQueue::new(job_repo.clone()));
    let batch = Arc::new(BatchScheduler::new(
        queue.clone(),
        budget.clone(),
        store.clone(),
        settings.untappd.cost_per_checkin,
    ));
    let importer = Arc::new(Importer::new(
        api.clone(),
        batch,
        budget.clone(),
        cursor_repo,
        store.clone(),
        queue.clone(),
        SyncStatusTracker::new(cache.clone()),
    ));

    // 6. Start workers and bootstrap recurring jobs
    let mut worker_manager = WorkerManager::new(
        job_repo,
        budget,
        store,
        api,
        queue,
        importer,
        settings.untappd.cost_per_checkin,
        settings.untappd.cost_per_companion,
        Duration::from_secs(settings.import.poll_interval),
    );

    worker_manager
        .init_scheduled_jobs(&settings.import.user)
        .await?;
    worker_manager
        .start_workers(settings.import.worker_count)
        .await;

    // 7. Wait for shutdown
    worker_manager.wait_for_shutdown().await;

    Ok(())
}
