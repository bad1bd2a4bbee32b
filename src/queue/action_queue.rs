// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{Job, JobKind, JobPayload, JOB_GROUP};
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 仓库错误
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// 动作队列
///
/// 作业仓库之上的调度门面。后备仓库可以缺失（降级模式），
/// 此时所有操作都是成功的空操作：调用方不需要区分两种模式，
/// 导入流程在没有持久化队列的环境里照常运行，只是不产生作业。
pub struct ActionQueue {
    repo: Option<Arc<dyn JobRepository>>,
}

impl ActionQueue {
    /// 创建由仓库支撑的队列
    pub fn new(repo: Arc<dyn JobRepository>) -> Self {
        Self { repo: Some(repo) }
    }

    /// 创建降级模式队列（无持久化，全部空操作）
    pub fn disabled() -> Self {
        Self { repo: None }
    }

    /// 队列是否有持久化后备
    pub fn is_enabled(&self) -> bool {
        self.repo.is_some()
    }

    /// 调度一个单次作业
    ///
    /// 对相同种类和负载的Pending作业去重：已有待执行的同款
    /// 作业时不再入队。执行中的作业不阻止再次入队，确保
    /// 处理期间到达的新请求不会丢失。
    ///
    /// # 参数
    ///
    /// * `payload` - 作业负载，种类由负载决定
    /// * `delay` - 相对当前时刻的执行延迟
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(Uuid))` - 新作业的ID
    /// * `Ok(None)` - 去重命中或降级模式，未入队
    /// * `Err(QueueError)` - 仓库错误
    pub async fn schedule(
        &self,
        payload: &JobPayload,
        delay: Duration,
    ) -> Result<Option<Uuid>, QueueError> {
        let Some(repo) = &self.repo else {
            return Ok(None);
        };

        let kind = payload.kind();
        let value = payload.to_value();

        if repo.find_pending(kind, &value).await?.is_some() {
            debug!(kind = %kind, "duplicate pending job, skipping");
            return Ok(None);
        }

        let job = Job::new(kind, value, (Utc::now() + delay).into());
        let created = repo.create(&job).await?;

        debug!(kind = %kind, job_id = %created.id, delay_secs = delay.num_seconds(), "job scheduled");
        Ok(Some(created.id))
    }

    /// 调度一个循环作业
    ///
    /// 对相同种类和负载的Pending或Running作业去重，保证每个
    /// 循环序列只存在一条活跃作业。
    ///
    /// # 参数
    ///
    /// * `payload` - 作业负载
    /// * `interval_seconds` - 循环间隔（秒）
    pub async fn schedule_recurring(
        &self,
        payload: &JobPayload,
        interval_seconds: i64,
    ) -> Result<Option<Uuid>, QueueError> {
        let Some(repo) = &self.repo else {
            return Ok(None);
        };

        let kind = payload.kind();
        let value = payload.to_value();

        if repo.find_live(kind, &value).await?.is_some() {
            debug!(kind = %kind, "live recurring job exists, skipping");
            return Ok(None);
        }

        let job = Job::recurring(kind, value, interval_seconds);
        let created = repo.create(&job).await?;

        info!(kind = %kind, job_id = %created.id, interval_seconds, "recurring job scheduled");
        Ok(Some(created.id))
    }

    /// 查询同款Pending作业的下一次执行时间
    pub async fn next_scheduled(
        &self,
        payload: &JobPayload,
    ) -> Result<Option<DateTime<FixedOffset>>, QueueError> {
        let Some(repo) = &self.repo else {
            return Ok(None);
        };

        let job = repo.find_pending(payload.kind(), &payload.to_value()).await?;
        Ok(job.map(|j| j.scheduled_at))
    }

    /// 取消某种类下的全部未终态作业
    pub async fn cancel_all(&self, kind: JobKind) -> Result<u64, QueueError> {
        let Some(repo) = &self.repo else {
            return Ok(0);
        };

        let cancelled = repo.cancel_by_kind(kind).await?;
        if cancelled > 0 {
            info!(kind = %kind, cancelled, "jobs cancelled");
        }
        Ok(cancelled)
    }

    /// 取消本分组下的全部未终态作业（停用/重置时使用）
    pub async fn cleanup(&self) -> Result<u64, QueueError> {
        let Some(repo) = &self.repo else {
            return Ok(0);
        };

        let cancelled = repo.cancel_group(JOB_GROUP).await?;
        info!(cancelled, "queue cleaned up");
        Ok(cancelled)
    }
}
