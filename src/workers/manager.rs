// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::JobPayload;
use crate::domain::repositories::job_repository::JobRepository;
use crate::domain::services::content_store::ContentStore;
use crate::domain::services::untappd_api::UntappdApi;
use crate::queue::action_queue::{ActionQueue, QueueError};
use crate::queue::budget::ApiBudget;
use crate::walker::importer::Importer;
use crate::workers::checkin_worker::CheckinWorker;
use crate::workers::worker::Worker;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 每小时导入的循环间隔（秒）
const HOURLY_INTERVAL_SECONDS: i64 = 3600;

/// 每日维护的循环间隔（秒）
const DAILY_INTERVAL_SECONDS: i64 = 86_400;

/// 维护巡检间隔
const MAINTENANCE_TICK: Duration = Duration::from_secs(60);

/// 卡死作业的判定时长
const STUCK_TIMEOUT_MINUTES: i64 = 10;

/// 工作管理器
///
/// 启动作业执行器、维护巡检和循环作业引导。
pub struct WorkerManager {
    repo: Arc<dyn JobRepository>,
    budget: Arc<ApiBudget>,
    store: Arc<dyn ContentStore>,
    api: Arc<dyn UntappdApi>,
    queue: Arc<ActionQueue>,
    importer: Arc<Importer>,
    cost_per_checkin: u32,
    cost_per_companion: u32,
    poll_interval: Duration,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn JobRepository>,
        budget: Arc<ApiBudget>,
        store: Arc<dyn ContentStore>,
        api: Arc<dyn UntappdApi>,
        queue: Arc<ActionQueue>,
        importer: Arc<Importer>,
        cost_per_checkin: u32,
        cost_per_companion: u32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            repo,
            budget,
            store,
            api,
            queue,
            importer,
            cost_per_checkin,
            cost_per_companion,
            poll_interval,
            handles: Vec::new(),
        }
    }

    /// 为配置的用户引导循环作业
    ///
    /// 每小时一次增量导入、每天一次维护。已有活跃的同款循环
    /// 作业时引导是空操作，进程重启不会堆积重复作业。
    pub async fn init_scheduled_jobs(&self, user: &str) -> Result<(), QueueError> {
        self.queue
            .schedule_recurring(
                &JobPayload::HourlyImport {
                    user: user.to_string(),
                },
                HOURLY_INTERVAL_SECONDS,
            )
            .await?;

        self.queue
            .schedule_recurring(&JobPayload::DailyMaintenance {}, DAILY_INTERVAL_SECONDS)
            .await?;

        info!(user, "recurring jobs bootstrapped");
        Ok(())
    }

    /// 启动工作进程
    ///
    /// 创建并启动指定数量的工作进程，外加一个维护巡检任务
    ///
    /// # 参数
    ///
    /// * `count` - 要启动的工作进程数量
    pub async fn start_workers(&mut self, count: usize) {
        for _ in 0..count {
            let worker = CheckinWorker::new(
                self.repo.clone(),
                self.budget.clone(),
                self.store.clone(),
                self.api.clone(),
                self.queue.clone(),
                self.importer.clone(),
                self.cost_per_checkin,
                self.cost_per_companion,
                self.poll_interval,
            );

            // We spawn the worker loop on a separate task to avoid blocking the main thread
            // or the loop that spawns workers.
            let handle = tokio::spawn(async move {
                if let Err(e) = worker.run().await {
                    error!(worker = worker.name(), error = %e, "worker exited with error");
                }
            });
            self.handles.push(handle);
        }

        let repo = self.repo.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(MAINTENANCE_TICK);
            loop {
                interval.tick().await;
                match repo
                    .reset_stuck_jobs(chrono::Duration::minutes(STUCK_TIMEOUT_MINUTES))
                    .await
                {
                    Ok(0) => {}
                    Ok(reset) => warn!(reset, "stuck jobs reset to pending"),
                    Err(e) => error!(error = %e, "stuck job maintenance failed"),
                }
            }
        });
        self.handles.push(handle);

        info!(count, "workers started");
    }

    /// 等待关闭信号并关闭工作进程
    ///
    /// 监听关闭信号并优雅地关闭所有工作进程
    pub async fn wait_for_shutdown(&mut self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }

        info!("Shutting down workers...");
        for handle in &self.handles {
            handle.abort();
        }

        info!("Workers shut down successfully");
    }
}
