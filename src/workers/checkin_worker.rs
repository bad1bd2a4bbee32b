// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{Job, JobPayload, MaintenanceKind};
use crate::domain::repositories::job_repository::JobRepository;
use crate::domain::services::content_store::{ContentStore, StoreOutcome};
use crate::domain::services::untappd_api::UntappdApi;
use crate::queue::action_queue::ActionQueue;
use crate::queue::budget::ApiBudget;
use crate::utils::errors::WorkerError;
use crate::walker::importer::Importer;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use chrono::Duration;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 单项维护任务的预算开销
const COST_PER_MAINTENANCE: u32 = 1;

/// 预算不足时的推迟时长（秒），等一个完整预算窗口
const DEFER_SECONDS: i64 = 3600;

/// 每日维护派生任务之间的错峰间隔（秒）
const MAINTENANCE_STAGGER_SECONDS: i64 = 60;

/// 作业处理结果
enum JobResult {
    /// 正常完成
    Done,
    /// 预算不足，已推迟到下一窗口（原作业按完成处理）
    Deferred,
    /// 处理失败，不重试
    Failed(WorkerError),
}

/// 签到作业执行器
///
/// 轮询作业仓库领取到期作业，按种类分发处理。每个实际触达
/// 外部API或内容存储的作业在执行前复查预算，不足时调度一个
/// 推迟一个窗口的同款作业并把原作业按完成收尾——推迟不是失败。
pub struct CheckinWorker {
    worker_id: Uuid,
    repo: Arc<dyn JobRepository>,
    budget: Arc<ApiBudget>,
    store: Arc<dyn ContentStore>,
    api: Arc<dyn UntappdApi>,
    queue: Arc<ActionQueue>,
    importer: Arc<Importer>,
    /// 处理单条签到的预算开销估计
    cost_per_checkin: u32,
    /// 同行好友回填的预算开销估计
    cost_per_companion: u32,
    /// 队列为空时的轮询间隔
    poll_interval: StdDuration,
}

impl CheckinWorker {
    /// 创建签到作业执行器
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
        poll_interval: StdDuration,
    ) -> Self {
        Self {
            worker_id: Uuid::new_v4(),
            repo,
            budget,
            store,
            api,
            queue,
            importer,
            cost_per_checkin,
            cost_per_companion,
            poll_interval,
        }
    }

    /// 预算不足时把同款作业推到下一窗口
    async fn defer(&self, payload: &JobPayload) -> JobResult {
        match self
            .queue
            .schedule(payload, Duration::seconds(DEFER_SECONDS))
            .await
        {
            Ok(_) => {
                counter!("jobs_deferred_total").increment(1);
                debug!(kind = %payload.kind(), "insufficient budget, job deferred");
                JobResult::Deferred
            }
            Err(e) => JobResult::Failed(WorkerError::InternalError(e.to_string())),
        }
    }

    /// 处理单条签到落库作业
    async fn process_checkin(&self, payload: &JobPayload) -> JobResult {
        let JobPayload::ProcessCheckin { checkin, source } = payload else {
            return JobResult::Failed(WorkerError::InvalidPayload(
                "expected process_checkin payload".to_string(),
            ));
        };

        match self.budget.has_budget(self.cost_per_checkin).await {
            Ok(true) => {}
            Ok(false) => return self.defer(payload).await,
            Err(e) => return JobResult::Failed(WorkerError::BudgetError(e.to_string())),
        }
        if let Err(e) = self.budget.consume(self.cost_per_checkin).await {
            return JobResult::Failed(WorkerError::BudgetError(e.to_string()));
        }

        match self.store.insert_or_update(checkin, *source).await {
            Ok(StoreOutcome::Created(post_id)) => {
                debug!(
                    checkin_id = checkin.checkin_id,
                    post_id, "checkin stored"
                );

                // Tagged friends need a follow-up detail fetch
                let has_companions = checkin
                    .extra
                    .get("tagged_friends")
                    .and_then(|v| v.get("items"))
                    .and_then(|v| v.as_array())
                    .map(|items| !items.is_empty())
                    .unwrap_or(false);

                if has_companions {
                    let backfill = JobPayload::BackfillCompanion {
                        checkin_id: checkin.checkin_id,
                        post_id,
                    };
                    if let Err(e) = self.queue.schedule(&backfill, Duration::zero()).await {
                        warn!(
                            checkin_id = checkin.checkin_id,
                            error = %e,
                            "failed to schedule companion backfill"
                        );
                    }
                }
                JobResult::Done
            }
            // Duplicates are success, the work is already done
            Ok(StoreOutcome::Duplicate) => JobResult::Done,
            Err(e) => JobResult::Failed(WorkerError::StoreError(e.to_string())),
        }
    }

    /// 处理同行好友回填作业
    async fn backfill_companion(&self, payload: &JobPayload) -> JobResult {
        let JobPayload::BackfillCompanion {
            checkin_id,
            post_id,
        } = payload
        else {
            return JobResult::Failed(WorkerError::InvalidPayload(
                "expected backfill_companion payload".to_string(),
            ));
        };

        match self.budget.has_budget(self.cost_per_companion).await {
            Ok(true) => {}
            Ok(false) => return self.defer(payload).await,
            Err(e) => return JobResult::Failed(WorkerError::BudgetError(e.to_string())),
        }
        if let Err(e) = self.budget.consume(self.cost_per_companion).await {
            return JobResult::Failed(WorkerError::BudgetError(e.to_string()));
        }

        let detail = match self.api.fetch_checkin_detail(*checkin_id).await {
            Ok(response) => {
                if let Some(remaining) = response.ratelimit_remaining {
                    if let Err(e) = self.budget.resync(remaining, false).await {
                        warn!(error = %e, "budget resync failed after detail fetch");
                    }
                }
                response.body
            }
            // Missing or broken detail is a silent no-op, never a failure
            Err(e) => {
                debug!(checkin_id, error = %e, "checkin detail unavailable, skipping backfill");
                return JobResult::Done;
            }
        };

        match self
            .store
            .attach_companions(*checkin_id, *post_id, &detail)
            .await
        {
            Ok(()) => JobResult::Done,
            Err(e) => JobResult::Failed(WorkerError::StoreError(e.to_string())),
        }
    }

    /// 处理每小时导入作业
    async fn hourly_import(&self, payload: &JobPayload) -> JobResult {
        let JobPayload::HourlyImport { user } = payload else {
            return JobResult::Failed(WorkerError::InvalidPayload(
                "expected hourly_import payload".to_string(),
            ));
        };

        match self.importer.run_import(user).await {
            Ok(outcome) => {
                debug!(user, outcome = ?outcome, "hourly import finished");
                JobResult::Done
            }
            Err(e) => JobResult::Failed(WorkerError::ImportError(e.to_string())),
        }
    }

    /// 处理每日维护作业：派生各单项维护任务
    async fn daily_maintenance(&self) -> JobResult {
        for (index, task) in MaintenanceKind::ALL.into_iter().enumerate() {
            let payload = JobPayload::MaintenanceTask { task };
            let delay = Duration::seconds(MAINTENANCE_STAGGER_SECONDS * index as i64);

            if let Err(e) = self.queue.schedule(&payload, delay).await {
                return JobResult::Failed(WorkerError::InternalError(e.to_string()));
            }
        }
        JobResult::Done
    }

    /// 处理单项维护任务
    async fn maintenance_task(&self, payload: &JobPayload) -> JobResult {
        let JobPayload::MaintenanceTask { task } = payload else {
            return JobResult::Failed(WorkerError::InvalidPayload(
                "expected maintenance_task payload".to_string(),
            ));
        };

        match self.budget.has_budget(COST_PER_MAINTENANCE).await {
            Ok(true) => {}
            Ok(false) => return self.defer(payload).await,
            Err(e) => return JobResult::Failed(WorkerError::BudgetError(e.to_string())),
        }
        if let Err(e) = self.budget.consume(COST_PER_MAINTENANCE).await {
            return JobResult::Failed(WorkerError::BudgetError(e.to_string()));
        }

        match self.store.run_maintenance(*task).await {
            Ok(()) => JobResult::Done,
            Err(e) => JobResult::Failed(WorkerError::StoreError(e.to_string())),
        }
    }

    /// 处理单个已领取的作业
    async fn process(&self, job: Job) -> Result<(), WorkerError> {
        let payload = match JobPayload::from_value(job.kind, &job.payload) {
            Ok(payload) => payload,
            Err(e) => {
                error!(job_id = %job.id, kind = %job.kind, error = %e, "undecodable payload");
                self.repo
                    .mark_failed(job.id)
                    .await
                    .map_err(|e| WorkerError::RepositoryError(e.to_string()))?;
                counter!("jobs_failed_total").increment(1);
                return Ok(());
            }
        };

        let result = match &payload {
            JobPayload::ProcessCheckin { .. } => self.process_checkin(&payload).await,
            JobPayload::BackfillCompanion { .. } => self.backfill_companion(&payload).await,
            JobPayload::HourlyImport { .. } => self.hourly_import(&payload).await,
            JobPayload::DailyMaintenance {} => self.daily_maintenance().await,
            JobPayload::MaintenanceTask { .. } => self.maintenance_task(&payload).await,
        };

        match result {
            JobResult::Done | JobResult::Deferred => {
                self.repo
                    .mark_completed(job.id)
                    .await
                    .map_err(|e| WorkerError::RepositoryError(e.to_string()))?;
                counter!("jobs_completed_total").increment(1);
            }
            JobResult::Failed(err) => {
                error!(job_id = %job.id, kind = %job.kind, error = %err, "job failed");
                self.repo
                    .mark_failed(job.id)
                    .await
                    .map_err(|e| WorkerError::RepositoryError(e.to_string()))?;
                counter!("jobs_failed_total").increment(1);
            }
        }

        // Recurring jobs continue on their interval regardless of outcome
        if let Some(next) = job.next_occurrence() {
            match self.repo.find_live(next.kind, &next.payload).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    if let Err(e) = self.repo.create(&next).await {
                        warn!(job_id = %job.id, error = %e, "failed to reschedule recurring job");
                    }
                }
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "failed to reschedule recurring job");
                }
            }
        }

        Ok(())
    }

    /// 领取并处理一个到期作业
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 处理了一个作业
    /// * `Ok(false)` - 没有到期作业
    /// * `Err(WorkerError)` - 领取或收尾失败
    pub async fn run_once(&self) -> Result<bool, WorkerError> {
        let job = self
            .repo
            .acquire_next(self.worker_id)
            .await
            .map_err(|e| WorkerError::RepositoryError(e.to_string()))?;

        match job {
            Some(job) => {
                self.process(job).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl Worker for CheckinWorker {
    async fn run(&self) -> Result<(), WorkerError> {
        info!(worker_id = %self.worker_id, "checkin worker started");

        loop {
            match self.run_once().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(self.poll_interval).await,
                Err(e) => {
                    error!(error = %e, "job processing error");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    fn name(&self) -> &str {
        "checkin_worker"
    }
}
