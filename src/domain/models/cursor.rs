// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// 单个用户的导入游标
///
/// 记录历史回填和增量导入各自的进度。`max_id` 向过去推进，
/// `since_id` 只在首页设置一次，回填结束后由增量导入接管更新。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCursor {
    /// 目标用户名
    pub username: String,
    /// 是否仍在历史回填阶段
    pub backfilling: bool,
    /// 历史回填锚点：下一页取严格早于该ID的记录
    pub max_id: Option<i64>,
    /// 增量导入锚点：只取严格新于该ID的记录
    pub since_id: Option<i64>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
}

impl ImportCursor {
    /// 为新用户创建游标，初始处于回填阶段
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            backfilling: true,
            max_id: None,
            since_id: None,
            updated_at: Utc::now().into(),
        }
    }
}
