// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 导入游标仓库实现
pub mod cursor_repo_impl;

/// 作业仓库实现
pub mod job_repo_impl;
