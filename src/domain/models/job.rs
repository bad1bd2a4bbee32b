// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::checkin::{BatchSource, Checkin};

/// 本子系统所有作业的分组标签，用于批量取消
pub const JOB_GROUP: &str = "slurprs";

/// 作业实体
///
/// 表示一个可调度的离散工作单元：处理单条签到、补齐同行好友、
/// 每小时导入、每日维护或单项维护任务。作业具有目标执行时间、
/// 状态、锁定机制和可选的循环间隔。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// 作业唯一标识符
    pub id: Uuid,
    /// 作业种类，决定负载解码方式和处理逻辑
    pub kind: JobKind,
    /// 作业状态
    pub status: JobStatus,
    /// 分组标签，恒为 [`JOB_GROUP`]
    pub group_tag: String,
    /// 已序列化的作业负载，在执行器边界解码为 [`JobPayload`]
    pub payload: serde_json::Value,
    /// 是否为循环作业
    pub recurring: bool,
    /// 循环间隔（秒），仅循环作业使用
    pub interval_seconds: Option<i64>,
    /// 目标执行时间
    pub scheduled_at: DateTime<FixedOffset>,
    /// 开始执行时间
    pub started_at: Option<DateTime<FixedOffset>>,
    /// 完成时间
    pub completed_at: Option<DateTime<FixedOffset>>,
    /// 锁定令牌，标识持有该作业的Worker
    pub lock_token: Option<Uuid>,
    /// 锁定过期时间
    pub lock_expires_at: Option<DateTime<FixedOffset>>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
}

/// 作业种类枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// 处理单条已获取的签到
    ProcessCheckin,
    /// 回填单条签到的同行好友
    BackfillCompanion,
    /// 每小时增量/回填导入
    HourlyImport,
    /// 每日维护（派生各单项维护任务）
    DailyMaintenance,
    /// 单项维护任务
    MaintenanceTask,
}

impl JobKind {
    /// 全部作业种类，用于清理时的批量取消
    pub const ALL: [JobKind; 5] = [
        JobKind::ProcessCheckin,
        JobKind::BackfillCompanion,
        JobKind::HourlyImport,
        JobKind::DailyMaintenance,
        JobKind::MaintenanceTask,
    ];
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobKind::ProcessCheckin => write!(f, "process_checkin"),
            JobKind::BackfillCompanion => write!(f, "backfill_companion"),
            JobKind::HourlyImport => write!(f, "hourly_import"),
            JobKind::DailyMaintenance => write!(f, "daily_maintenance"),
            JobKind::MaintenanceTask => write!(f, "maintenance_task"),
        }
    }
}

impl FromStr for JobKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "process_checkin" => Ok(JobKind::ProcessCheckin),
            "backfill_companion" => Ok(JobKind::BackfillCompanion),
            "hourly_import" => Ok(JobKind::HourlyImport),
            "daily_maintenance" => Ok(JobKind::DailyMaintenance),
            "maintenance_task" => Ok(JobKind::MaintenanceTask),
            _ => Err(()),
        }
    }
}

/// 作业状态枚举
///
/// 状态转换遵循以下流程：
/// Pending → Running → Completed/Failed，任一非终态可转为Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// 待执行
    #[default]
    Pending,
    /// 执行中
    Running,
    /// 已完成
    Completed,
    /// 已失败
    Failed,
    /// 已取消
    Cancelled,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// 维护任务种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceKind {
    /// 刷新用户统计
    Stats,
    /// 回填缺失的酒厂元数据
    BreweryBackfill,
    /// 回填缺失的场所元数据
    VenueBackfill,
    /// 回填缺失的徽章描述
    BadgeBackfill,
}

impl MaintenanceKind {
    /// 每日维护派生的任务清单，按派生顺序排列
    pub const ALL: [MaintenanceKind; 4] = [
        MaintenanceKind::Stats,
        MaintenanceKind::BreweryBackfill,
        MaintenanceKind::VenueBackfill,
        MaintenanceKind::BadgeBackfill,
    ];
}

impl fmt::Display for MaintenanceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MaintenanceKind::Stats => write!(f, "stats"),
            MaintenanceKind::BreweryBackfill => write!(f, "brewery_backfill"),
            MaintenanceKind::VenueBackfill => write!(f, "venue_backfill"),
            MaintenanceKind::BadgeBackfill => write!(f, "badge_backfill"),
        }
    }
}

/// 按作业种类区分的结构化负载
///
/// 负载以JSON形式持久化在作业记录中，仅在执行器边界解码，
/// 避免在系统各处以字符串键访问松散数据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobPayload {
    /// 处理签到：签到数据 + 来源标记
    ProcessCheckin {
        checkin: Checkin,
        source: BatchSource,
    },
    /// 同行好友回填：签到ID + 帖子ID
    BackfillCompanion { checkin_id: i64, post_id: i64 },
    /// 每小时导入：目标用户
    HourlyImport { user: String },
    /// 单项维护任务
    MaintenanceTask { task: MaintenanceKind },
    /// 每日维护：无参数
    DailyMaintenance {},
}

/// 领域错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 无效的状态转换
    #[error("Invalid state transition")]
    InvalidStateTransition,

    /// 负载解码失败
    #[error("Payload decode error: {0}")]
    PayloadDecode(String),
}

impl JobPayload {
    /// 返回该负载对应的作业种类
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::ProcessCheckin { .. } => JobKind::ProcessCheckin,
            JobPayload::BackfillCompanion { .. } => JobKind::BackfillCompanion,
            JobPayload::HourlyImport { .. } => JobKind::HourlyImport,
            JobPayload::DailyMaintenance {} => JobKind::DailyMaintenance,
            JobPayload::MaintenanceTask { .. } => JobKind::MaintenanceTask,
        }
    }

    /// 序列化为作业记录携带的JSON负载
    ///
    /// 负载类型全部由可序列化字段构成，序列化不会失败。
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// 从作业记录解码负载（执行器边界）
    ///
    /// # 参数
    ///
    /// * `kind` - 作业种类，决定期望的负载形状
    /// * `value` - 持久化的JSON负载
    ///
    /// # 返回值
    ///
    /// * `Ok(JobPayload)` - 解码后的结构化负载
    /// * `Err(DomainError)` - 负载与作业种类不匹配
    pub fn from_value(kind: JobKind, value: &serde_json::Value) -> Result<Self, DomainError> {
        let decode_err = |e: serde_json::Error| DomainError::PayloadDecode(e.to_string());

        match kind {
            JobKind::ProcessCheckin => {
                #[derive(Deserialize)]
                struct P {
                    checkin: Checkin,
                    source: BatchSource,
                }
                let p: P = serde_json::from_value(value.clone()).map_err(decode_err)?;
                Ok(JobPayload::ProcessCheckin {
                    checkin: p.checkin,
                    source: p.source,
                })
            }
            JobKind::BackfillCompanion => {
                #[derive(Deserialize)]
                struct P {
                    checkin_id: i64,
                    post_id: i64,
                }
                let p: P = serde_json::from_value(value.clone()).map_err(decode_err)?;
                Ok(JobPayload::BackfillCompanion {
                    checkin_id: p.checkin_id,
                    post_id: p.post_id,
                })
            }
            JobKind::HourlyImport => {
                #[derive(Deserialize)]
                struct P {
                    user: String,
                }
                let p: P = serde_json::from_value(value.clone()).map_err(decode_err)?;
                Ok(JobPayload::HourlyImport { user: p.user })
            }
            JobKind::DailyMaintenance => Ok(JobPayload::DailyMaintenance {}),
            JobKind::MaintenanceTask => {
                #[derive(Deserialize)]
                struct P {
                    task: MaintenanceKind,
                }
                let p: P = serde_json::from_value(value.clone()).map_err(decode_err)?;
                Ok(JobPayload::MaintenanceTask { task: p.task })
            }
        }
    }
}

impl Job {
    /// 创建一个新的单次作业
    ///
    /// # 参数
    ///
    /// * `kind` - 作业种类
    /// * `payload` - 作业负载JSON
    /// * `scheduled_at` - 目标执行时间
    ///
    /// # 返回值
    ///
    /// 返回新创建的作业实例
    pub fn new(
        kind: JobKind,
        payload: serde_json::Value,
        scheduled_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            status: JobStatus::Pending,
            group_tag: JOB_GROUP.to_string(),
            payload,
            recurring: false,
            interval_seconds: None,
            scheduled_at,
            started_at: None,
            completed_at: None,
            lock_token: None,
            lock_expires_at: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    /// 创建一个新的循环作业，首次执行时间为当前时刻
    pub fn recurring(kind: JobKind, payload: serde_json::Value, interval_seconds: i64) -> Self {
        let mut job = Self::new(kind, payload, Utc::now().into());
        job.recurring = true;
        job.interval_seconds = Some(interval_seconds);
        job
    }

    /// 启动作业
    ///
    /// 将作业状态从Pending变更为Running
    ///
    /// # 返回值
    ///
    /// * `Ok(Job)` - 成功启动的作业
    /// * `Err(DomainError)` - 状态转换失败
    pub fn start(mut self) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Pending => {
                self.status = JobStatus::Running;
                self.started_at = Some(Utc::now().into());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 完成作业
    ///
    /// 将作业状态从Running变更为Completed
    pub fn complete(mut self) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Running => {
                self.status = JobStatus::Completed;
                self.completed_at = Some(Utc::now().into());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 标记作业失败
    ///
    /// 将作业状态从Running变更为Failed
    pub fn fail(mut self) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Running => {
                self.status = JobStatus::Failed;
                self.completed_at = Some(Utc::now().into());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 取消作业
    pub fn cancel(mut self) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Pending | JobStatus::Running => {
                self.status = JobStatus::Cancelled;
                self.completed_at = Some(Utc::now().into());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// 构造下一次循环作业
    ///
    /// 仅对循环作业有意义；返回同种类、同负载、执行时间为
    /// 当前时刻加间隔的全新Pending作业。
    pub fn next_occurrence(&self) -> Option<Self> {
        let interval = self.interval_seconds?;
        if !self.recurring {
            return None;
        }
        let mut next = Self::new(
            self.kind,
            self.payload.clone(),
            (Utc::now() + chrono::Duration::seconds(interval)).into(),
        );
        next.recurring = true;
        next.interval_seconds = Some(interval);
        Some(next)
    }
}
