// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 集成测试模块
///
/// 使用内存实现的仓库、内容存储和API替身，对导入流水线的
/// 队列、游走器和执行器进行场景测试
pub mod helpers;

mod queue_test;
mod worker_test;
