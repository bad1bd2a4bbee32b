// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::infrastructure::cache::redis_client::RedisClient;

/// 共享键值存储特质
///
/// 预算窗口和同步状态都通过该接口落盘。生产环境使用
/// [`RedisCacheStore`]，测试使用进程内的 [`MemoryCacheStore`]。
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 读取键值，不存在或已过期时返回None
    async fn get(&self, key: &str) -> Result<Option<String>>;
    /// 写入键值并指定过期时间（秒）
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: usize) -> Result<()>;
    /// 永久写入键值
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    /// 删除键
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Redis实现
pub struct RedisCacheStore {
    client: RedisClient,
}

impl RedisCacheStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.client.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: usize) -> Result<()> {
        self.client.set(key, value, ttl_seconds).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.client.set_forever(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client.delete(key).await
    }
}

/// 进程内实现
///
/// 带过期时间的内存键值表，读取时惰性清理过期条目。
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((_, Some(expires))) if *expires <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: usize) -> Result<()> {
        let expires = Instant::now() + Duration::from_secs(ttl_seconds as u64);
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), Some(expires)));
        Ok(())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), None));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
