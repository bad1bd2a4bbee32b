// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据库内容存储实现
pub mod content_store_impl;

/// 签到API客户端实现
pub mod untappd_client;
