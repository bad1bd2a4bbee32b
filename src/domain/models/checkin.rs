// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 单页期望的签到条数，短页（少于该值）表示历史回填已到尽头
pub const PAGE_SIZE: usize = 25;

/// 批次来源标记
///
/// 标记一批签到来自历史回填还是增量导入，随负载一起持久化，
/// 供执行器在日志和指标中区分两条导入路径。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSource {
    /// 历史回填（向过去翻页）
    ImportOld,
    /// 增量导入（仅取新于游标的记录）
    ImportNew,
}

impl fmt::Display for BatchSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BatchSource::ImportOld => write!(f, "import_old"),
            BatchSource::ImportNew => write!(f, "import_new"),
        }
    }
}

/// 单条签到记录
///
/// 只有签到ID是系统关心的结构化字段，其余字段原样保留并
/// 随负载传递给内容存储。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkin {
    /// 签到唯一ID，全局单调递增
    pub checkin_id: i64,
    /// 其余原始字段
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// 分页指示
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Pagination {
    /// 下一历史页的锚点ID
    pub max_id: Option<i64>,
    /// 增量导入URL，携带 `min_id` 查询参数
    pub since_url: Option<String>,
}

/// 一页已规范化的签到响应
#[derive(Debug, Clone, Default)]
pub struct CheckinPage {
    /// 按响应顺序排列的签到（增量响应为最新在前）
    pub items: Vec<Checkin>,
    /// 分页指示
    pub pagination: Pagination,
}

impl CheckinPage {
    /// 从原始API响应体规范化出一页签到
    ///
    /// 响应体中签到列表可能直接位于 `response.checkins.items`，
    /// 也可能多包一层出现在 `response.checkins.checkins.items`；
    /// 分页块同样可能位于外层或内层。两种形状都接受。
    ///
    /// # 参数
    ///
    /// * `body` - 已解析的响应体JSON
    ///
    /// # 返回值
    ///
    /// * `Ok(CheckinPage)` - 规范化后的页
    /// * `Err(String)` - 响应缺少约定结构，附带说明
    pub fn from_response(body: &serde_json::Value) -> Result<Self, String> {
        let response = body
            .get("response")
            .ok_or_else(|| "missing `response` object".to_string())?;

        let outer = response
            .get("checkins")
            .ok_or_else(|| "missing `checkins` object".to_string())?;

        // Unwrap the optional extra nesting level
        let inner = match outer.get("checkins") {
            Some(nested) if nested.is_object() => nested,
            _ => outer,
        };

        let items_value = inner
            .get("items")
            .ok_or_else(|| "missing `items` array".to_string())?;

        let items: Vec<Checkin> = serde_json::from_value(items_value.clone())
            .map_err(|e| format!("malformed checkin items: {}", e))?;

        let pagination = inner
            .get("pagination")
            .or_else(|| response.get("pagination"))
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| format!("malformed pagination: {}", e))?
            .unwrap_or_default();

        Ok(Self { items, pagination })
    }

    /// 该页是否为短页（历史回填到头的信号）
    pub fn is_short(&self) -> bool {
        self.items.len() < PAGE_SIZE
    }
}

/// 从增量导入URL中提取 `min_id` 查询参数
///
/// # 参数
///
/// * `since_url` - 分页块中的增量导入URL
///
/// # 返回值
///
/// 解析成功时返回参数值，URL或参数缺失/非法时返回None
pub fn parse_since_id(since_url: &str) -> Option<i64> {
    let url = url::Url::parse(since_url).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "min_id")
        .and_then(|(_, v)| v.parse::<i64>().ok())
}
