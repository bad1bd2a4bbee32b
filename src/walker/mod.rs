// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 导入游走器
pub mod importer;

/// 同步状态追踪
pub mod sync_status;
