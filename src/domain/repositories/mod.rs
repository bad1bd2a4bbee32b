// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 导入游标仓库接口
pub mod cursor_repository;

/// 作业仓库接口
pub mod job_repository;
