// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::checkin::{BatchSource, Checkin};
use crate::domain::models::job::MaintenanceKind;
use async_trait::async_trait;
use thiserror::Error;

/// 内容存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// 持久化失败
    #[error("persistence error: {0}")]
    Persistence(String),
    /// 数据不完整，无法落库
    #[error("incomplete checkin data: {0}")]
    Incomplete(String),
}

/// 单条签到的落库结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// 新建内容，返回内容ID
    Created(i64),
    /// 签到已存在，视为成功
    Duplicate,
}

/// 下游内容存储特质
///
/// 签到最终落到的内容系统。执行器通过该接口写入，
/// 游走器的恢复阶梯通过 `latest_checkin_id` 读取。
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// 检查签到是否已落库
    async fn checkin_exists(&self, checkin_id: i64) -> Result<bool, StoreError>;

    /// 落库或更新一条签到
    ///
    /// 重复签到返回 [`StoreOutcome::Duplicate`]，调用方按成功处理。
    async fn insert_or_update(
        &self,
        checkin: &Checkin,
        source: BatchSource,
    ) -> Result<StoreOutcome, StoreError>;

    /// 为已落库的签到附加同行好友
    async fn attach_companions(
        &self,
        checkin_id: i64,
        post_id: i64,
        detail: &serde_json::Value,
    ) -> Result<(), StoreError>;

    /// 已落库的最新签到ID，空库时返回None
    async fn latest_checkin_id(&self) -> Result<Option<i64>, StoreError>;

    /// 执行一项维护任务
    async fn run_maintenance(&self, task: MaintenanceKind) -> Result<(), StoreError>;
}
