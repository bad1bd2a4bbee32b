// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

/// API错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    /// 认证失败（凭证缺失或被拒绝）
    #[error("authentication failed")]
    Unauthorized,
    /// 提供方返回限流响应
    #[error("rate limited by provider")]
    RateLimited,
    /// 网络层瞬时错误
    #[error("transient error: {0}")]
    Transient(String),
    /// 响应体不是合法JSON或缺少约定结构
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// 一次API调用的结果
///
/// 除响应体外还携带提供方限流头的剩余额度，供预算追踪器
/// 在每次调用后对账。
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// 已解析的响应体
    pub body: serde_json::Value,
    /// `X-Ratelimit-Remaining` 头的值，缺失或非法时为None
    pub ratelimit_remaining: Option<i64>,
}

/// 外部签到API特质
///
/// 游走器和执行器只依赖这两个调用；具体HTTP实现见
/// `infrastructure::services::untappd_client`。
#[async_trait]
pub trait UntappdApi: Send + Sync {
    /// 拉取某用户的一页签到
    ///
    /// # 参数
    ///
    /// * `user` - 目标用户名
    /// * `max_id` - 只取严格早于该ID的记录（历史回填）
    /// * `min_id` - 只取严格新于该ID的记录（增量导入）
    /// * `limit` - 单页条数上限
    ///
    /// # 返回值
    ///
    /// * `Ok(ApiResponse)` - 原始响应体和限流头
    /// * `Err(ApiError)` - 调用失败
    async fn fetch_checkins(
        &self,
        user: &str,
        max_id: Option<i64>,
        min_id: Option<i64>,
        limit: usize,
    ) -> Result<ApiResponse, ApiError>;

    /// 拉取单条签到的完整详情（含同行好友）
    async fn fetch_checkin_detail(&self, checkin_id: i64) -> Result<ApiResponse, ApiError>;
}
