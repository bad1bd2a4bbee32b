// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::checkin::{parse_since_id, BatchSource, CheckinPage, PAGE_SIZE};
use crate::domain::models::cursor::ImportCursor;
use crate::domain::repositories::cursor_repository::CursorRepository;
use crate::domain::services::content_store::ContentStore;
use crate::domain::services::untappd_api::UntappdApi;
use crate::queue::action_queue::ActionQueue;
use crate::queue::batch::BatchScheduler;
use crate::queue::budget::ApiBudget;
use crate::utils::errors::ImportError;
use crate::walker::sync_status::SyncStatusTracker;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 一次导入的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// 增量导入没有新记录
    NothingNew,
    /// 增量导入取到新记录并排批
    Queued { fetched: usize, queued: usize },
    /// 历史回填推进了一页
    BackfillPage {
        fetched: usize,
        queued: usize,
        /// 短页表示历史已取尽，回填阶段结束
        exhausted: bool,
    },
}

/// 导入游走器
///
/// 对单个用户按游标推进两条导入路径：历史回填（向过去翻页）和
/// 增量导入（只取新于游标的记录）。游走器负责游标的读写和
/// 同步状态记录，取到的签到交给批量调度器展开成作业。
pub struct Importer {
    api: Arc<dyn UntappdApi>,
    batch: Arc<BatchScheduler>,
    budget: Arc<ApiBudget>,
    cursors: Arc<dyn CursorRepository>,
    store: Arc<dyn ContentStore>,
    queue: Arc<ActionQueue>,
    status: SyncStatusTracker,
}

/// 校验用户名
///
/// 只接受非空且由字母、数字、`.`、`_`、`-` 组成的名字。
///
/// # 参数
///
/// * `user` - 待校验的用户名
///
/// # 返回值
///
/// * `Ok(&str)` - 原样返回合法用户名
/// * `Err(ImportError)` - 非法用户名
pub fn sanitize_user(user: &str) -> Result<&str, ImportError> {
    if user.is_empty() {
        return Err(ImportError::InvalidUser(user.to_string()));
    }
    if !user
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ImportError::InvalidUser(user.to_string()));
    }
    Ok(user)
}

impl Importer {
    /// 创建导入游走器
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<dyn UntappdApi>,
        batch: Arc<BatchScheduler>,
        budget: Arc<ApiBudget>,
        cursors: Arc<dyn CursorRepository>,
        store: Arc<dyn ContentStore>,
        queue: Arc<ActionQueue>,
        status: SyncStatusTracker,
    ) -> Self {
        Self {
            api,
            batch,
            budget,
            cursors,
            store,
            queue,
            status,
        }
    }

    /// 消费一个预算单位并拉取一页签到，调用后用限流头对账
    async fn fetch_page(
        &self,
        user: &str,
        max_id: Option<i64>,
        min_id: Option<i64>,
    ) -> Result<CheckinPage, ImportError> {
        if !self.budget.has_budget(1).await? {
            return Err(ImportError::RateLimited);
        }
        self.budget.consume(1).await?;

        let response = self
            .api
            .fetch_checkins(user, max_id, min_id, PAGE_SIZE)
            .await?;

        if let Some(remaining) = response.ratelimit_remaining {
            self.budget.resync(remaining, false).await?;
        }

        counter!("import_pages_total").increment(1);
        CheckinPage::from_response(&response.body).map_err(ImportError::InvalidResponse)
    }

    /// 推进一页历史回填
    ///
    /// 游标总是先推进并持久化，之后才把本页签到交给批量调度器；
    /// 拉取或解析失败时游标保持原状。`since_id` 只在首页从分页块的
    /// 增量URL中取一次，之后由增量导入接管。
    pub async fn import_old(&self, user: &str) -> Result<ImportOutcome, ImportError> {
        let user = sanitize_user(user)?;
        let mut cursor = self
            .cursors
            .find_by_user(user)
            .await?
            .unwrap_or_else(|| ImportCursor::new(user));

        let page = self.fetch_page(user, cursor.max_id, None).await?;
        let fetched = page.items.len();
        let exhausted = page.is_short();

        // Advance the backfill anchor before anything can fail downstream
        cursor.max_id = page
            .pagination
            .max_id
            .or_else(|| page.items.last().map(|c| c.checkin_id));

        if cursor.since_id.is_none() {
            cursor.since_id = page
                .pagination
                .since_url
                .as_deref()
                .and_then(parse_since_id);
        }

        if exhausted {
            info!(user, fetched, "backfill reached end of history");
            cursor.backfilling = false;
        }

        self.cursors.save(&cursor).await?;

        let queued = self
            .batch
            .queue_batch(&page.items, BatchSource::ImportOld)
            .await?;

        debug!(user, fetched, queued, exhausted, "backfill page imported");
        Ok(ImportOutcome::BackfillPage {
            fetched,
            queued,
            exhausted,
        })
    }

    /// 拉取新于游标的签到，瞬时失败时走恢复阶梯
    ///
    /// 阶梯：内容存储中最新的签到ID作为替代锚点；仍失败则
    /// 无锚点拉取；再失败则把最后的错误向上传播。
    async fn fetch_new(
        &self,
        user: &str,
        since_id: Option<i64>,
    ) -> Result<CheckinPage, ImportError> {
        let first = self.fetch_page(user, None, since_id).await;
        let err = match first {
            Ok(ok) => return Ok(ok),
            Err(e @ ImportError::TransientFetch(_)) => e,
            Err(e) => return Err(e),
        };

        warn!(user, error = %err, "incremental fetch failed, trying stored anchor");
        if let Some(latest) = self.store.latest_checkin_id().await? {
            if let Ok(ok) = self.fetch_page(user, None, Some(latest)).await {
                return Ok(ok);
            }
        }

        warn!(user, "anchored retry failed, trying unbounded fetch");
        match self.fetch_page(user, None, None).await {
            Ok(ok) => Ok(ok),
            Err(last) => Err(last),
        }
    }

    /// 执行一次增量导入
    ///
    /// 回填未结束、用户尚无游标或从未捕获过增量锚点时委托给
    /// [`Self::import_old`]。增量响应按最新在前排列，游标推进到
    /// 首条记录的ID，并在排批之前持久化——排批中途失败不会导致
    /// 同一批记录被重取。
    pub async fn import_new(&self, user: &str) -> Result<ImportOutcome, ImportError> {
        let user = sanitize_user(user)?;
        let cursor = self.cursors.find_by_user(user).await?;

        let mut cursor = match cursor {
            Some(c) if !c.backfilling && c.since_id.is_some() => c,
            _ => return self.import_old(user).await,
        };

        let page = self.fetch_new(user, cursor.since_id).await?;
        let fetched = page.items.len();

        if fetched == 0 {
            debug!(user, "no new checkins");
            return Ok(ImportOutcome::NothingNew);
        }

        cursor.since_id = Some(page.items[0].checkin_id);
        self.cursors.save(&cursor).await?;

        let queued = self
            .batch
            .queue_batch(&page.items, BatchSource::ImportNew)
            .await?;

        info!(user, fetched, queued, "incremental import queued");
        Ok(ImportOutcome::Queued { fetched, queued })
    }

    /// 执行一次导入并记录同步状态
    ///
    /// 回填阶段走历史回填，否则走增量导入。成功更新上次同步
    /// 时间，失败记录错误码和描述后把错误向上传播。
    pub async fn run_import(&self, user: &str) -> Result<ImportOutcome, ImportError> {
        let result = self.dispatch(user).await;

        match &result {
            Ok(_) => {
                self.status.record_success().await?;
            }
            Err(err) => {
                counter!("import_errors_total").increment(1);
                self.status.record_error(err.code(), &err.to_string()).await?;
            }
        }

        result
    }

    async fn dispatch(&self, user: &str) -> Result<ImportOutcome, ImportError> {
        let user = sanitize_user(user)?;
        match self.cursors.find_by_user(user).await? {
            Some(c) if !c.backfilling => self.import_new(user).await,
            _ => self.import_old(user).await,
        }
    }

    /// 快速回填：在预算允许的范围内连续翻页
    ///
    /// 每页消费一个预算单位，直到预算耗尽、达到页数上限、
    /// 历史取尽或拉取出错为止。出错不向上传播，已完成的页数
    /// 照常返回。
    ///
    /// # 参数
    ///
    /// * `user` - 目标用户名
    /// * `max_pages` - 本次最多推进的页数
    ///
    /// # 返回值
    ///
    /// 实际推进的页数
    pub async fn prime_queue(&self, user: &str, max_pages: usize) -> Result<usize, ImportError> {
        let user = sanitize_user(user)?;
        let mut pages = 0usize;

        while pages < max_pages {
            if !self.budget.has_budget(1).await? {
                info!(user, pages, "budget exhausted, stopping prime run");
                break;
            }

            match self.import_old(user).await {
                Ok(ImportOutcome::BackfillPage { exhausted, .. }) => {
                    pages += 1;
                    if exhausted {
                        info!(user, pages, "history exhausted, prime run complete");
                        break;
                    }
                }
                Ok(_) => break,
                Err(err) => {
                    warn!(user, pages, error = %err, "prime run stopped on error");
                    break;
                }
            }
        }

        Ok(pages)
    }

    /// 完全重置：取消全部作业、删除游标、清空预算窗口
    pub async fn reset_user(&self, user: &str) -> Result<(), ImportError> {
        let user = sanitize_user(user)?;

        self.queue.cleanup().await?;
        self.cursors.delete(user).await?;
        self.budget.reset().await?;

        info!(user, "import state fully reset");
        Ok(())
    }
}
