// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 签到作业执行器
pub mod checkin_worker;

/// 工作管理器
pub mod manager;

/// Worker trait定义
pub mod worker;
