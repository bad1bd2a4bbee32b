// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::WorkerError;
use async_trait::async_trait;

/// 后台工作单元
///
/// 作业执行器这类长驻循环的统一入口。工作管理器为每个单元
/// 生成独立任务并在关闭时统一中止，名字用于退出日志定位。
#[async_trait]
pub trait Worker: Send + Sync {
    /// 进入工作循环，正常情况下不返回
    async fn run(&self) -> Result<(), WorkerError>;

    /// 日志中标识该工作单元的名字
    fn name(&self) -> &str;
}
