// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{Job, JobKind, JobStatus};
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use crate::infrastructure::database::entities::job as job_entity;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::{
    sea_query::{Expr, LockBehavior, LockType},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

/// 作业仓库实现
///
/// 基于SeaORM实现的作业数据访问层
#[derive(Clone)]
pub struct JobRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl JobRepositoryImpl {
    /// 创建新的作业仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    ///
    /// # 返回值
    ///
    /// 返回新的作业仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<job_entity::Model> for Job {
    fn from(model: job_entity::Model) -> Self {
        Self {
            id: model.id,
            kind: model
                .kind
                .parse()
                .unwrap_or(JobKind::ProcessCheckin),
            status: model.status.parse().unwrap_or_default(),
            group_tag: model.group_tag,
            payload: model.payload,
            recurring: model.recurring,
            interval_seconds: model.interval_seconds,
            scheduled_at: model.scheduled_at,
            started_at: model.started_at,
            completed_at: model.completed_at,
            lock_token: model.lock_token,
            lock_expires_at: model.lock_expires_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<Job> for job_entity::ActiveModel {
    fn from(job: Job) -> Self {
        Self {
            id: Set(job.id),
            kind: Set(job.kind.to_string()),
            status: Set(job.status.to_string()),
            group_tag: Set(job.group_tag.clone()),
            payload: Set(job.payload.clone()),
            recurring: Set(job.recurring),
            interval_seconds: Set(job.interval_seconds),
            scheduled_at: Set(job.scheduled_at),
            started_at: Set(job.started_at),
            completed_at: Set(job.completed_at),
            lock_token: Set(job.lock_token),
            lock_expires_at: Set(job.lock_expires_at),
            created_at: Set(job.created_at),
            updated_at: Set(job.updated_at),
        }
    }
}

#[async_trait]
impl JobRepository for JobRepositoryImpl {
    async fn create(&self, job: &Job) -> Result<Job, RepositoryError> {
        let model: job_entity::ActiveModel = job.clone().into();

        model.insert(self.db.as_ref()).await?;
        Ok(job.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError> {
        let model = job_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn update(&self, job: &Job) -> Result<Job, RepositoryError> {
        let mut model: job_entity::ActiveModel = job.clone().into();

        model.status = Set(job.status.to_string());
        model.scheduled_at = Set(job.scheduled_at);
        model.started_at = Set(job.started_at);
        model.completed_at = Set(job.completed_at);
        model.updated_at = Set(Utc::now().into());

        let updated_model = model.update(self.db.as_ref()).await?;
        Ok(updated_model.into())
    }

    async fn find_pending(
        &self,
        kind: JobKind,
        payload: &serde_json::Value,
    ) -> Result<Option<Job>, RepositoryError> {
        let model = job_entity::Entity::find()
            .filter(job_entity::Column::Kind.eq(kind.to_string()))
            .filter(job_entity::Column::Status.eq(JobStatus::Pending.to_string()))
            .filter(job_entity::Column::Payload.eq(payload.clone()))
            .order_by_asc(job_entity::Column::ScheduledAt)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn find_live(
        &self,
        kind: JobKind,
        payload: &serde_json::Value,
    ) -> Result<Option<Job>, RepositoryError> {
        let model = job_entity::Entity::find()
            .filter(job_entity::Column::Kind.eq(kind.to_string()))
            .filter(
                Condition::any()
                    .add(job_entity::Column::Status.eq(JobStatus::Pending.to_string()))
                    .add(job_entity::Column::Status.eq(JobStatus::Running.to_string())),
            )
            .filter(job_entity::Column::Payload.eq(payload.clone()))
            .order_by_asc(job_entity::Column::ScheduledAt)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn acquire_next(&self, worker_id: Uuid) -> Result<Option<Job>, RepositoryError> {
        let txn = self.db.begin().await?;

        let job = job_entity::Entity::find()
            .filter(job_entity::Column::Status.eq(JobStatus::Pending.to_string()))
            .filter(job_entity::Column::ScheduledAt.lte(Utc::now()))
            .order_by_asc(job_entity::Column::ScheduledAt)
            .order_by_asc(job_entity::Column::CreatedAt)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .one(&txn)
            .await?;

        if let Some(job) = job {
            let mut active: job_entity::ActiveModel = job.into();
            active.lock_token = Set(Some(worker_id));
            active.lock_expires_at = Set(Some((Utc::now() + Duration::minutes(5)).into()));
            active.status = Set(JobStatus::Running.to_string());
            active.started_at = Set(Some(Utc::now().into()));

            let updated = active.update(&txn).await?;

            txn.commit().await?;

            return Ok(Some(updated.into()));
        } else {
            txn.commit().await?;
        }

        Ok(None)
    }

    async fn mark_completed(&self, id: Uuid) -> Result<(), RepositoryError> {
        let job = self
            .find_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let mut updated_job = job.clone();
        updated_job.status = JobStatus::Completed;
        updated_job.completed_at = Some(Utc::now().into());
        self.update(&updated_job).await?;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid) -> Result<(), RepositoryError> {
        let job = self
            .find_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let mut updated_job = job.clone();
        updated_job.status = JobStatus::Failed;
        updated_job.completed_at = Some(Utc::now().into());
        self.update(&updated_job).await?;
        Ok(())
    }

    async fn reset_stuck_jobs(&self, timeout: chrono::Duration) -> Result<u64, RepositoryError> {
        let threshold = Utc::now() - timeout;

        let result = job_entity::Entity::update_many()
            .col_expr(
                job_entity::Column::Status,
                Expr::value(JobStatus::Pending.to_string()),
            )
            .col_expr(
                job_entity::Column::LockToken,
                Expr::value(Option::<Uuid>::None),
            )
            .col_expr(
                job_entity::Column::LockExpiresAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .filter(job_entity::Column::Status.eq(JobStatus::Running.to_string()))
            .filter(
                Condition::any()
                    .add(job_entity::Column::LockExpiresAt.lte(Utc::now()))
                    .add(
                        Condition::all()
                            .add(job_entity::Column::LockExpiresAt.is_null())
                            .add(job_entity::Column::StartedAt.lte(threshold)),
                    ),
            )
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }

    async fn cancel_by_kind(&self, kind: JobKind) -> Result<u64, RepositoryError> {
        let result = job_entity::Entity::update_many()
            .col_expr(
                job_entity::Column::Status,
                Expr::value(JobStatus::Cancelled.to_string()),
            )
            .col_expr(
                job_entity::Column::CompletedAt,
                Expr::value(Some(DateTime::<FixedOffset>::from(Utc::now()))),
            )
            .filter(job_entity::Column::Kind.eq(kind.to_string()))
            .filter(
                Condition::any()
                    .add(job_entity::Column::Status.eq(JobStatus::Pending.to_string()))
                    .add(job_entity::Column::Status.eq(JobStatus::Running.to_string())),
            )
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }

    async fn cancel_group(&self, group_tag: &str) -> Result<u64, RepositoryError> {
        let result = job_entity::Entity::update_many()
            .col_expr(
                job_entity::Column::Status,
                Expr::value(JobStatus::Cancelled.to_string()),
            )
            .col_expr(
                job_entity::Column::CompletedAt,
                Expr::value(Some(DateTime::<FixedOffset>::from(Utc::now()))),
            )
            .filter(job_entity::Column::GroupTag.eq(group_tag))
            .filter(
                Condition::any()
                    .add(job_entity::Column::Status.eq(JobStatus::Pending.to_string()))
                    .add(job_entity::Column::Status.eq(JobStatus::Running.to_string())),
            )
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }

    async fn count_pending(&self, group_tag: &str) -> Result<u64, RepositoryError> {
        let count = job_entity::Entity::find()
            .filter(job_entity::Column::GroupTag.eq(group_tag))
            .filter(job_entity::Column::Status.eq(JobStatus::Pending.to_string()))
            .count(self.db.as_ref())
            .await?;
        Ok(count)
    }
}
