//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了一致性缓存的配置结构和解析逻辑。

use crate::error::{CacheError, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_VERSION: u32 = 1;

const MAX_TTL_SECS: u64 = 86400 * 30;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub config_version: Option<u32>,
    pub consistency: ConsistencyConfig,
    pub cache: CacheConfig,
    pub store: StoreConfig,
}

/// 一致性策略配置
///
/// 定义正向/空值缓存的过期时间与禁用窗口
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ConsistencyConfig {
    /// 正向缓存过期时间（秒）
    pub positive_ttl_secs: u64,
    /// 空值缓存过期时间（秒），不得超过正向缓存
    pub negative_ttl_secs: u64,
    /// 禁用标记的兜底过期时间（秒）
    pub disable_expire_secs: u64,
    /// 重新启用的延迟（毫秒）
    pub enable_delay_ms: u64,
    /// 是否合并同一 key 的并发回源
    pub single_flight: bool,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            positive_ttl_secs: 300,
            negative_ttl_secs: 30,
            disable_expire_secs: 10,
            enable_delay_ms: 500,
            single_flight: false,
        }
    }
}

/// 缓存后端类型
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// 进程内缓存
    #[default]
    Memory,
    /// Redis
    Redis,
}

/// 缓存配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// 内存缓存最大条目数
    pub max_capacity: u64,
    /// 后端键前缀
    pub key_prefix: String,
    /// Redis配置，仅在 backend = "redis" 时使用
    pub redis: RedisConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            max_capacity: 100_000,
            key_prefix: "cc".to_string(),
            redis: RedisConfig::default(),
        }
    }
}

/// Redis配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis模式
    pub mode: RedisMode,
    /// 连接字符串
    pub connection_string: SecretString,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
    /// Redis 密码（可选，使用 SecretString 保护）
    pub password: Option<SecretString>,
    /// 是否启用 TLS
    pub enable_tls: bool,
    /// 哨兵配置
    pub sentinel: Option<SentinelConfig>,
    /// 集群配置
    pub cluster: Option<ClusterConfig>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            mode: RedisMode::Standalone,
            connection_string: SecretString::new("redis://localhost:6379".to_string().into()),
            connection_timeout_ms: 5000,
            command_timeout_ms: 3000,
            password: None,
            enable_tls: false,
            sentinel: None,
            cluster: None,
        }
    }
}

/// Redis模式枚举
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    /// 单机模式
    Standalone,
    /// 哨兵模式
    Sentinel,
    /// 集群模式
    Cluster,
}

/// 哨兵配置
#[derive(Deserialize, Clone, Debug)]
pub struct SentinelConfig {
    /// 主节点名称
    pub master_name: String,
    /// 哨兵节点列表
    pub nodes: Vec<String>,
}

/// 集群配置
#[derive(Deserialize, Clone, Debug)]
pub struct ClusterConfig {
    /// 初始节点列表
    pub nodes: Vec<String>,
}

/// 数据库后端类型
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// 进程内表，仅用于测试和单机场景
    #[default]
    Memory,
    /// SQLite / PostgreSQL / MySQL（通过sea-orm）
    Sql,
}

/// 数据库配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// 连接字符串
    pub connection_string: SecretString,
    /// 未声明表名的记录使用的默认表
    pub default_table: String,
    /// 默认表的键列名，命令行工具未指定列名时也使用它
    pub default_key_column: String,
    /// 启动时是否创建默认表（仅 backend = "sql"）
    pub auto_create_table: bool,
    /// 最大连接数
    pub max_connections: u32,
    /// 连接超时时间（秒）
    pub connect_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            connection_string: SecretString::new("sqlite::memory:".to_string().into()),
            default_table: crate::store::DEFAULT_TABLE.to_string(),
            default_key_column: "id".to_string(),
            auto_create_table: true,
            max_connections: 10,
            connect_timeout_secs: 30,
        }
    }
}

impl Config {
    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CacheError::ConfigError(e.to_string()))
    }

    /// 从TOML文件加载配置并验证
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        config.validate().map_err(CacheError::ConfigError)?;
        Ok(config)
    }

    /// 验证配置
    ///
    /// 检查配置的有效性，确保所有值在合理范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = self.config_version {
            if version > CONFIG_VERSION {
                return Err(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                ));
            }
        }

        let c = &self.consistency;
        if c.positive_ttl_secs == 0 || c.positive_ttl_secs > MAX_TTL_SECS {
            return Err("positive_ttl_secs must be between 1 and 2592000 seconds".to_string());
        }
        if c.negative_ttl_secs == 0 {
            return Err("negative_ttl_secs cannot be zero".to_string());
        }
        if c.negative_ttl_secs > c.positive_ttl_secs {
            return Err(format!(
                "negative_ttl_secs ({}) must be <= positive_ttl_secs ({})",
                c.negative_ttl_secs, c.positive_ttl_secs
            ));
        }
        if c.disable_expire_secs == 0 || c.disable_expire_secs > MAX_TTL_SECS {
            return Err("disable_expire_secs must be between 1 and 2592000 seconds".to_string());
        }
        if c.enable_delay_ms > c.disable_expire_secs * 1000 {
            return Err(format!(
                "enable_delay_ms ({}) must not exceed disable_expire_secs ({}s)",
                c.enable_delay_ms, c.disable_expire_secs
            ));
        }

        let prefix = &self.cache.key_prefix;
        if prefix.is_empty() {
            return Err("cache key_prefix cannot be empty".to_string());
        }
        if prefix.contains('{') || prefix.contains('}') {
            return Err(format!(
                "cache key_prefix '{}' must not contain braces",
                prefix
            ));
        }
        if self.cache.backend == CacheBackend::Memory && self.cache.max_capacity == 0 {
            return Err("cache max_capacity cannot be zero".to_string());
        }

        if self.cache.backend == CacheBackend::Redis {
            let redis = &self.cache.redis;
            if !(100..=30000).contains(&redis.connection_timeout_ms) {
                return Err("redis connection_timeout_ms must be between 100 and 30000 ms".to_string());
            }
            if !(100..=60000).contains(&redis.command_timeout_ms) {
                return Err("redis command_timeout_ms must be between 100 and 60000 ms".to_string());
            }
            if redis.mode == RedisMode::Cluster && redis.cluster.is_none() {
                return Err("redis cluster mode requires a [cache.redis.cluster] section".to_string());
            }
            if redis.mode == RedisMode::Sentinel && redis.sentinel.is_none() {
                return Err(
                    "redis sentinel mode requires a [cache.redis.sentinel] section".to_string(),
                );
            }
        }

        if crate::store::validate_identifier(&self.store.default_table).is_err() {
            return Err(format!(
                "store default_table '{}' is not a valid identifier",
                self.store.default_table
            ));
        }
        if crate::store::validate_identifier(&self.store.default_key_column).is_err()
            || self.store.default_key_column == crate::store::PAYLOAD_COLUMN
        {
            return Err(format!(
                "store default_key_column '{}' is not a valid key column",
                self.store.default_key_column
            ));
        }
        if self.store.backend == StoreBackend::Sql {
            if self.store.max_connections == 0 {
                return Err("store max_connections cannot be zero".to_string());
            }
            if self.store.connect_timeout_secs == 0 {
                return Err("store connect_timeout_secs cannot be zero".to_string());
            }
        }

        Ok(())
    }
}
