// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::cache::cache_store::CacheStore;
use crate::utils::errors::ImportError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 同步状态在共享存储中的键
const SYNC_STATUS_KEY: &str = "slurprs:sync_status";

/// 最近一次导入失败的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncError {
    /// 稳定错误码
    pub code: String,
    /// 人类可读的错误描述
    pub message: String,
    /// 记录时刻（Unix秒）
    pub at: i64,
}

/// 导入同步状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// 最近一次成功导入的时刻（Unix秒）
    pub last_sync: Option<i64>,
    /// 最近一次失败，成功后保留供排查
    pub last_error: Option<SyncError>,
}

/// 同步状态追踪器
///
/// 每次导入结束后记录结果，供运维查询上次成功时间和最近错误。
/// 状态永久保存，不设TTL。
pub struct SyncStatusTracker {
    store: Arc<dyn CacheStore>,
}

impl SyncStatusTracker {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// 读取当前同步状态，从未同步时返回默认值
    pub async fn load(&self) -> Result<SyncStatus, ImportError> {
        let raw = self
            .store
            .get(SYNC_STATUS_KEY)
            .await
            .map_err(|e| ImportError::Cache(e.to_string()))?;

        Ok(raw
            .and_then(|r| serde_json::from_str(&r).ok())
            .unwrap_or_default())
    }

    /// 记录一次成功导入
    pub async fn record_success(&self) -> Result<(), ImportError> {
        let mut status = self.load().await?;
        status.last_sync = Some(Utc::now().timestamp());
        self.persist(&status).await
    }

    /// 记录一次失败
    ///
    /// # 参数
    ///
    /// * `code` - 稳定错误码
    /// * `message` - 错误描述
    pub async fn record_error(&self, code: &str, message: &str) -> Result<(), ImportError> {
        let mut status = self.load().await?;
        status.last_error = Some(SyncError {
            code: code.to_string(),
            message: message.to_string(),
            at: Utc::now().timestamp(),
        });
        self.persist(&status).await
    }

    async fn persist(&self, status: &SyncStatus) -> Result<(), ImportError> {
        let raw =
            serde_json::to_string(status).map_err(|e| ImportError::Cache(e.to_string()))?;
        self.store
            .set(SYNC_STATUS_KEY, &raw)
            .await
            .map_err(|e| ImportError::Cache(e.to_string()))
    }
}
