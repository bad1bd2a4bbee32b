// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

use crate::domain::repositories::job_repository::RepositoryError;
use crate::domain::services::content_store::StoreError;
use crate::domain::services::untappd_api::ApiError;
use crate::queue::action_queue::QueueError;

/// 导入流程错误类型
///
/// 覆盖游走器和批量调度器可能遇到的所有错误情况。
/// `InvalidUser` 和 `InvalidResponse` 永不重试；`RateLimited`
/// 在下一个预算窗口后重试；`TransientFetch` 走恢复阶梯。
#[derive(Error, Debug)]
pub enum ImportError {
    /// 用户名为空或包含非法字符
    #[error("invalid user name: {0}")]
    InvalidUser(String),

    /// 外部API返回限流响应
    #[error("rate limited by provider")]
    RateLimited,

    /// 认证失败（凭证缺失或被拒绝）
    #[error("authentication failed")]
    Unauthorized,

    /// 网络或解析层面的瞬时错误
    #[error("transient fetch error: {0}")]
    TransientFetch(String),

    /// API响应结构不符合约定
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// 队列错误
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// 游标仓库错误
    #[error("cursor repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// 内容存储错误
    #[error("content store error: {0}")]
    Store(#[from] StoreError),

    /// 共享缓存错误
    #[error("cache error: {0}")]
    Cache(String),
}

impl ImportError {
    /// 返回用于同步状态记录的稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::InvalidUser(_) => "invalid_user",
            ImportError::RateLimited => "rate_limited",
            ImportError::Unauthorized => "unauthorized",
            ImportError::TransientFetch(_) => "transient_fetch",
            ImportError::InvalidResponse(_) => "invalid_response",
            ImportError::Queue(_) => "queue_error",
            ImportError::Repository(_) => "repository_error",
            ImportError::Store(_) => "store_error",
            ImportError::Cache(_) => "cache_error",
        }
    }
}

impl From<ApiError> for ImportError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => ImportError::Unauthorized,
            ApiError::RateLimited => ImportError::RateLimited,
            ApiError::Transient(msg) => ImportError::TransientFetch(msg),
            ApiError::InvalidResponse(msg) => ImportError::InvalidResponse(msg),
        }
    }
}

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("仓库错误: {0}")]
    RepositoryError(String),

    #[error("预算错误: {0}")]
    BudgetError(String),

    #[error("内容存储错误: {0}")]
    StoreError(String),

    #[error("导入错误: {0}")]
    ImportError(String),

    #[error("无效负载: {0}")]
    InvalidPayload(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}
