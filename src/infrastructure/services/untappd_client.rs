// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::UntappdSettings;
use crate::domain::services::untappd_api::{ApiError, ApiResponse, UntappdApi};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// 提供方限流头
const RATELIMIT_HEADER: &str = "X-Ratelimit-Remaining";

/// 签到API客户端实现
///
/// 基于reqwest的HTTP客户端，凭证以查询参数附加在每个请求上。
pub struct UntappdClient {
    /// HTTP 客户端
    client: reqwest::Client,
    /// API根地址
    base_url: String,
    /// 应用凭证
    client_id: String,
    client_secret: String,
}

impl UntappdClient {
    /// 创建新的API客户端
    ///
    /// # 参数
    ///
    /// * `settings` - API配置（根地址和凭证）
    ///
    /// # 返回值
    ///
    /// 返回新的客户端实例
    pub fn new(settings: &UntappdSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
        }
    }

    /// 发送请求并把响应规范化为 [`ApiResponse`]
    async fn execute(&self, url: &str, params: &[(&str, String)]) -> Result<ApiResponse, ApiError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(ApiError::Unauthorized);
        }

        let response = self
            .client
            .get(url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .query(params)
            .send()
            .await
            .map_err(|e| ApiError::Transient(e.to_string()))?;

        let ratelimit_remaining = response
            .headers()
            .get(RATELIMIT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok());

        debug!(
            status = %response.status(),
            ratelimit_remaining = ?ratelimit_remaining,
            url = %url,
            "API response received"
        );

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(ApiError::RateLimited),
            status if !status.is_success() => {
                Err(ApiError::Transient(format!("HTTP status {}", status)))
            }
            _ => {
                let body: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
                Ok(ApiResponse {
                    body,
                    ratelimit_remaining,
                })
            }
        }
    }
}

#[async_trait]
impl UntappdApi for UntappdClient {
    async fn fetch_checkins(
        &self,
        user: &str,
        max_id: Option<i64>,
        min_id: Option<i64>,
        limit: usize,
    ) -> Result<ApiResponse, ApiError> {
        let url = format!("{}/user/checkins/{}", self.base_url, user);

        let mut params: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if let Some(max_id) = max_id {
            params.push(("max_id", max_id.to_string()));
        }
        if let Some(min_id) = min_id {
            params.push(("min_id", min_id.to_string()));
        }

        self.execute(&url, &params).await
    }

    async fn fetch_checkin_detail(&self, checkin_id: i64) -> Result<ApiResponse, ApiError> {
        let url = format!("{}/checkin/view/{}", self.base_url, checkin_id);
        self.execute(&url, &[]).await
    }
}
