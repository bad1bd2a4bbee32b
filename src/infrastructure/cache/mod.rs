// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 共享键值存储抽象
pub mod cache_store;

/// Redis客户端
pub mod redis_client;
