// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::cache::cache_store::CacheStore;
use crate::utils::errors::ImportError;
use chrono::Utc;
use metrics::gauge;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// 预算窗口在共享存储中的键
const BUDGET_KEY: &str = "slurprs:api_budget";

/// 预算窗口长度（秒），与提供方的滚动限流窗口对齐
pub const WINDOW_SECONDS: i64 = 3600;

/// 预算窗口状态
///
/// `window_end` 为None表示窗口尚未开启，首次消费时才锚定。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BudgetWindow {
    /// 本窗口已消费的预算单位
    used: u32,
    /// 窗口结束时刻（Unix秒）
    window_end: Option<i64>,
}

/// API预算追踪器
///
/// 在共享存储中维护一个带TTL的小时预算窗口。所有进程共享
/// 同一个窗口，消费和对账都在读改写周期内完成。追踪器偏保守：
/// 宁可少发请求，也不触碰提供方的硬上限。
pub struct ApiBudget {
    store: Arc<dyn CacheStore>,
    /// 每窗口预算上限
    ceiling: u32,
}

impl ApiBudget {
    /// 创建预算追踪器
    ///
    /// # 参数
    ///
    /// * `store` - 共享键值存储
    /// * `ceiling` - 每窗口预算上限
    pub fn new(store: Arc<dyn CacheStore>, ceiling: u32) -> Self {
        Self { store, ceiling }
    }

    /// 预算上限
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// 读取当前窗口，过期或缺失时返回全新窗口
    async fn load(&self) -> Result<BudgetWindow, ImportError> {
        let raw = self
            .store
            .get(BUDGET_KEY)
            .await
            .map_err(|e| ImportError::Cache(e.to_string()))?;

        let window = match raw {
            Some(raw) => serde_json::from_str::<BudgetWindow>(&raw).unwrap_or_default(),
            None => BudgetWindow::default(),
        };

        // Stale window past its end counts as no window at all
        match window.window_end {
            Some(end) if end <= Utc::now().timestamp() => Ok(BudgetWindow::default()),
            _ => Ok(window),
        }
    }

    /// 持久化窗口，TTL对齐窗口剩余时长
    async fn persist(&self, window: &BudgetWindow) -> Result<(), ImportError> {
        let raw = serde_json::to_string(window)
            .map_err(|e| ImportError::Cache(e.to_string()))?;

        let ttl = match window.window_end {
            Some(end) => (end - Utc::now().timestamp()).max(1) as usize,
            None => WINDOW_SECONDS as usize,
        };

        self.store
            .set_ex(BUDGET_KEY, &raw, ttl)
            .await
            .map_err(|e| ImportError::Cache(e.to_string()))?;

        gauge!("api_budget_remaining").set(self.ceiling.saturating_sub(window.used) as f64);
        Ok(())
    }

    /// 当前窗口剩余预算
    pub async fn remaining(&self) -> Result<u32, ImportError> {
        let window = self.load().await?;
        Ok(self.ceiling.saturating_sub(window.used))
    }

    /// 检查剩余预算是否足以支付 `amount` 个单位
    pub async fn has_budget(&self, amount: u32) -> Result<bool, ImportError> {
        Ok(self.remaining().await? >= amount)
    }

    /// 消费 `amount` 个预算单位
    ///
    /// 首次消费（窗口未锚定时）把窗口结束时刻定在一小时后。
    /// 消费不做余额检查，调用方负责先调用 [`Self::has_budget`]。
    pub async fn consume(&self, amount: u32) -> Result<(), ImportError> {
        let mut window = self.load().await?;

        if window.window_end.is_none() {
            window.window_end = Some(Utc::now().timestamp() + WINDOW_SECONDS);
        }
        window.used = window.used.saturating_add(amount);

        debug!(used = window.used, ceiling = self.ceiling, "budget consumed");
        self.persist(&window).await
    }

    /// 用提供方限流头对账
    ///
    /// 把本地计数替换为提供方视角的消费量
    /// `ceiling - remaining_from_header`，夹取到 [0, ceiling]。
    /// 两种情况视为窗口翻转并清除窗口锚点：调用方显式给出
    /// 翻转提示，或对账后的消费量低于本地记录（提供方额度
    /// 回升只可能来自翻转）。
    ///
    /// # 参数
    ///
    /// * `remaining_from_header` - 限流头报告的剩余额度
    /// * `rollover_hint` - 调用方检测到的窗口翻转信号
    pub async fn resync(
        &self,
        remaining_from_header: i64,
        rollover_hint: bool,
    ) -> Result<(), ImportError> {
        let mut window = self.load().await?;

        let computed = (self.ceiling as i64 - remaining_from_header).clamp(0, self.ceiling as i64)
            as u32;
        let rollover = rollover_hint || computed < window.used;

        if rollover {
            window.window_end = None;
        } else if window.window_end.is_none() {
            window.window_end = Some(Utc::now().timestamp() + WINDOW_SECONDS);
        }
        window.used = computed;

        debug!(
            used = window.used,
            rollover = rollover,
            "budget resynced from provider header"
        );
        self.persist(&window).await
    }

    /// 删除窗口状态，下次消费从零开始
    pub async fn reset(&self) -> Result<(), ImportError> {
        self.store
            .delete(BUDGET_KEY)
            .await
            .map_err(|e| ImportError::Cache(e.to_string()))
    }
}
