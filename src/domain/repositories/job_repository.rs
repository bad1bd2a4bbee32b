// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{Job, JobKind};
use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// 作业仓库特质
///
/// 定义作业数据访问接口。去重查询按种类加负载匹配，
/// `find_pending` 仅匹配Pending状态（执行中的作业不阻止再次入队），
/// `find_live` 额外匹配Running状态（循环作业在全生命周期内去重）。
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// 创建新作业
    async fn create(&self, job: &Job) -> Result<Job, RepositoryError>;
    /// 根据ID查找作业
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError>;
    /// 更新作业
    async fn update(&self, job: &Job) -> Result<Job, RepositoryError>;
    /// 查找匹配种类和负载的Pending作业
    async fn find_pending(
        &self,
        kind: JobKind,
        payload: &serde_json::Value,
    ) -> Result<Option<Job>, RepositoryError>;
    /// 查找匹配种类和负载的Pending或Running作业
    async fn find_live(
        &self,
        kind: JobKind,
        payload: &serde_json::Value,
    ) -> Result<Option<Job>, RepositoryError>;
    /// 获取下一个到期的待处理作业并锁定
    async fn acquire_next(&self, worker_id: Uuid) -> Result<Option<Job>, RepositoryError>;
    /// 标记作业已完成
    async fn mark_completed(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// 标记作业已失败
    async fn mark_failed(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// 重置卡住的作业（锁已过期仍处于Running状态）
    async fn reset_stuck_jobs(&self, timeout: chrono::Duration) -> Result<u64, RepositoryError>;
    /// 取消某种类下的全部未终态作业，返回取消数量
    async fn cancel_by_kind(&self, kind: JobKind) -> Result<u64, RepositoryError>;
    /// 取消某分组下的全部未终态作业，返回取消数量
    async fn cancel_group(&self, group_tag: &str) -> Result<u64, RepositoryError>;
    /// 统计某分组下的Pending作业数
    async fn count_pending(&self, group_tag: &str) -> Result<u64, RepositoryError>;
}
