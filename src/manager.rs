//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存管理器，负责根据配置组装并登记一致性缓存实例。

use crate::cache::{CacheStore, MemoryCache, RedisCache};
use crate::config::{CacheBackend, Config, StoreBackend};
use crate::coordinator::{ConsistencyPolicy, ConsistentCache};
use crate::error::{CacheError, Result};
use crate::store::{MemoryRows, PersistentStore, RecordStore, SeaOrmRows};
use crate::utils::redaction::redact_connection_string;
use dashmap::DashMap;
use lazy_static::lazy_static;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{info, instrument};

lazy_static! {
    pub static ref MANAGER: Arc<DashMap<String, Arc<ConsistentCache>>> = Arc::new(DashMap::new());
}

/// 缓存管理器
pub struct CacheManager;

impl CacheManager {
    /// 根据配置组装一致性缓存
    #[instrument(skip(config), level = "info", fields(cache = ?config.cache.backend, store = ?config.store.backend))]
    pub async fn build(name: &str, config: &Config) -> Result<ConsistentCache> {
        config.validate().map_err(CacheError::ConfigError)?;

        let cache: Arc<dyn CacheStore> = match config.cache.backend {
            CacheBackend::Memory => Arc::new(MemoryCache::new(config.cache.max_capacity)),
            CacheBackend::Redis => {
                info!(
                    "Connecting cache to {}",
                    redact_connection_string(config.cache.redis.connection_string.expose_secret())
                );
                Arc::new(RedisCache::new(&config.cache.redis, &config.cache.key_prefix).await?)
            }
        };

        let store_cfg = &config.store;
        let store: Arc<dyn PersistentStore> = match store_cfg.backend {
            StoreBackend::Memory => Arc::new(RecordStore::new(
                MemoryRows::new(),
                store_cfg.default_table.clone(),
            )),
            StoreBackend::Sql => {
                let rows = SeaOrmRows::connect(store_cfg).await?;
                if store_cfg.auto_create_table {
                    rows.ensure_table(&store_cfg.default_table, &store_cfg.default_key_column)
                        .await?;
                }
                Arc::new(RecordStore::new(rows, store_cfg.default_table.clone()))
            }
        };

        info!("Consistent cache '{}' ready", name);
        Ok(ConsistentCache::new(cache, store)
            .with_name(name)
            .with_policy(ConsistencyPolicy::from(&config.consistency))
            .with_single_flight(config.consistency.single_flight))
    }

    /// 组装并登记一致性缓存，同名实例会被替换
    pub async fn init(name: &str, config: &Config) -> Result<Arc<ConsistentCache>> {
        let cc = Arc::new(Self::build(name, config).await?);
        MANAGER.insert(name.to_string(), cc.clone());
        Ok(cc)
    }

    /// 清除所有已登记的实例（仅用于测试）
    #[doc(hidden)]
    pub fn reset() {
        MANAGER.clear();
    }
}

/// 获取已登记的一致性缓存
pub fn get_client(name: &str) -> Result<Arc<ConsistentCache>> {
    MANAGER
        .get(name)
        .map(|r| r.value().clone())
        .ok_or_else(|| CacheError::ConfigError(format!("未找到服务{}", name)))
}
