// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含数据库、Redis、外部API和导入流程的所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// Redis配置
    pub redis: RedisSettings,
    /// 外部签到API配置
    pub untappd: UntappdSettings,
    /// 导入流程配置
    pub import: ImportSettings,
}

/// 数据库配置设置
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// Redis配置设置
#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    /// Redis连接URL
    pub url: String,
}

/// 外部签到API配置设置
#[derive(Debug, Deserialize)]
pub struct UntappdSettings {
    /// API根地址
    pub base_url: String,
    /// 应用凭证ID
    pub client_id: String,
    /// 应用凭证密钥
    pub client_secret: String,
    /// 每窗口预算上限，低于提供方硬上限以留出带外余量
    pub budget_per_hour: u32,
    /// 处理单条签到的预算开销估计
    pub cost_per_checkin: u32,
    /// 同行好友回填的预算开销估计
    pub cost_per_companion: u32,
}

/// 导入流程配置设置
#[derive(Debug, Deserialize)]
pub struct ImportSettings {
    /// 目标用户名
    pub user: String,
    /// 工作进程数量
    pub worker_count: usize,
    /// 队列为空时的轮询间隔（秒）
    pub poll_interval: u64,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Default DB pool settings
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 2)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default API settings
            .set_default("untappd.base_url", "https://api.untappd.com/v4")?
            .set_default("untappd.client_id", "")?
            .set_default("untappd.client_secret", "")?
            .set_default("untappd.budget_per_hour", 90)?
            .set_default("untappd.cost_per_checkin", 4)?
            .set_default("untappd.cost_per_companion", 2)?
            // Default import settings
            .set_default("import.worker_count", 2)?
            .set_default("import.poll_interval", 5)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("SLURPRS").separator("__"));

        builder.build()?.try_deserialize()
    }
}
