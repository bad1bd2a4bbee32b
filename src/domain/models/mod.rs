// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 签到模型
pub mod checkin;

/// 导入游标模型
pub mod cursor;

/// 作业模型
pub mod job;
