// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 动作队列
pub mod action_queue;

/// 批量调度器
pub mod batch;

/// API预算追踪器
pub mod budget;
