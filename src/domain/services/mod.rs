// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 内容存储接口
pub mod content_store;

/// 外部签到API接口
pub mod untappd_api;
