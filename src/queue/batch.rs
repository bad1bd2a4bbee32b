// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::checkin::{BatchSource, Checkin};
use crate::domain::models::job::JobPayload;
use crate::domain::services::content_store::ContentStore;
use crate::queue::action_queue::ActionQueue;
use crate::queue::budget::ApiBudget;
use crate::utils::errors::ImportError;
use chrono::Duration;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info};

/// 排批时扣留的安全余量（预算单位）
const BATCH_BUFFER: u32 = 2;

/// 同窗口内相邻作业的错峰间隔（秒）
const STAGGER_SECONDS: i64 = 2;

/// 预算溢出后推迟到下一窗口的延迟（秒）
const OVERFLOW_DEFER_SECONDS: i64 = 3600;

/// 批量调度器
///
/// 把一页签到展开为逐条处理作业，按预算余量决定每条作业落在
/// 当前窗口还是下一窗口。已落库的签到直接跳过。
pub struct BatchScheduler {
    queue: Arc<ActionQueue>,
    budget: Arc<ApiBudget>,
    store: Arc<dyn ContentStore>,
    /// 处理单条签到的预算开销估计
    cost_per_checkin: u32,
}

impl BatchScheduler {
    /// 创建批量调度器
    ///
    /// # 参数
    ///
    /// * `queue` - 动作队列
    /// * `budget` - 预算追踪器
    /// * `store` - 内容存储（幂等预检查用）
    /// * `cost_per_checkin` - 单条签到的开销估计
    pub fn new(
        queue: Arc<ActionQueue>,
        budget: Arc<ApiBudget>,
        store: Arc<dyn ContentStore>,
        cost_per_checkin: u32,
    ) -> Self {
        Self {
            queue,
            budget,
            store,
            cost_per_checkin,
        }
    }

    /// 把一批签到排入队列
    ///
    /// 可用预算为当前余量减去安全余量（下限0）。批次内累计开销
    /// 首次超过可用预算时，延迟一次性跳到下一窗口，之后继续以
    /// 错峰间隔递增——同一批次最多溢出一次，不会级联推迟。
    ///
    /// # 参数
    ///
    /// * `checkins` - 待排批的签到
    /// * `source` - 批次来源标记
    ///
    /// # 返回值
    ///
    /// * `Ok(usize)` - 实际创建的作业数（跳过和去重不计入）
    /// * `Err(ImportError)` - 预算、存储或队列错误
    pub async fn queue_batch(
        &self,
        checkins: &[Checkin],
        source: BatchSource,
    ) -> Result<usize, ImportError> {
        let remaining = self.budget.remaining().await?;
        let usable = remaining.saturating_sub(BATCH_BUFFER);

        let mut delay: i64 = 0;
        let mut spent: u32 = 0;
        let mut overflowed = false;
        let mut queued = 0usize;

        for checkin in checkins {
            if self.store.checkin_exists(checkin.checkin_id).await? {
                debug!(checkin_id = checkin.checkin_id, "checkin already stored, skipping");
                continue;
            }

            spent = spent.saturating_add(self.cost_per_checkin);
            if !overflowed && spent > usable {
                overflowed = true;
                delay = OVERFLOW_DEFER_SECONDS;
                debug!(
                    usable,
                    spent, "batch overflows current window, deferring remainder"
                );
            }

            let payload = JobPayload::ProcessCheckin {
                checkin: checkin.clone(),
                source,
            };

            if self
                .queue
                .schedule(&payload, Duration::seconds(delay))
                .await?
                .is_some()
            {
                queued += 1;
            }

            delay += STAGGER_SECONDS;
        }

        counter!("import_checkins_queued_total").increment(queued as u64);
        info!(
            total = checkins.len(),
            queued,
            source = %source,
            "batch queued"
        );
        Ok(queued)
    }
}
