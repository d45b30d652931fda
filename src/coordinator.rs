//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了一致性协调器，负责在缓存与数据库之间编排读写流程。

use crate::cache::CacheStore;
use crate::config::ConsistencyConfig;
use crate::context::Context;
use crate::error::{CacheError, Result};
use crate::metrics::GLOBAL_METRICS;
use crate::record::{encode_payload, Record};
use crate::store::PersistentStore;
use crate::sync::{Flight, SingleFlight};
use crate::utils::redaction::redact_cache_key;
use crate::NULL_DATA;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, instrument, warn};

/// 一致性策略
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsistencyPolicy {
    /// 正向缓存过期时间（秒）
    pub positive_ttl_secs: u64,
    /// 空值缓存过期时间（秒）
    pub negative_ttl_secs: u64,
    /// 禁用标记的兜底过期时间（秒）
    pub disable_expire_secs: u64,
    /// 重新启用的延迟（毫秒）
    pub enable_delay_ms: u64,
}

impl Default for ConsistencyPolicy {
    fn default() -> Self {
        Self::from(&ConsistencyConfig::default())
    }
}

impl From<&ConsistencyConfig> for ConsistencyPolicy {
    fn from(config: &ConsistencyConfig) -> Self {
        Self {
            positive_ttl_secs: config.positive_ttl_secs,
            negative_ttl_secs: config.negative_ttl_secs,
            disable_expire_secs: config.disable_expire_secs,
            enable_delay_ms: config.enable_delay_ms,
        }
    }
}

/// 一致性缓存
///
/// 读流程：先读缓存，未命中时回源数据库并尽力回填；数据库中不存在时回填空值哨兵。
/// 写流程：先写数据库，成功后删除缓存。
///
/// 协调器本身不持有任何按 key 的状态，克隆得到的实例共享同一组后端。
#[derive(Clone)]
pub struct ConsistentCache {
    name: String,
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn PersistentStore>,
    policy: ConsistencyPolicy,
    single_flight: Option<Arc<SingleFlight>>,
}

impl std::fmt::Debug for ConsistentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistentCache")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("single_flight", &self.single_flight.is_some())
            .finish()
    }
}

impl ConsistentCache {
    pub fn new(cache: Arc<dyn CacheStore>, store: Arc<dyn PersistentStore>) -> Self {
        Self {
            name: "default".to_string(),
            cache,
            store,
            policy: ConsistencyPolicy::default(),
            single_flight: None,
        }
    }

    /// 指标与日志中使用的名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_policy(mut self, policy: ConsistencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 是否合并同一 key 的并发回源
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled.then(|| Arc::new(SingleFlight::new()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &ConsistencyPolicy {
        &self.policy
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn PersistentStore> {
        &self.store
    }

    /// 记录在缓存中的 key：`{table}:{key}`
    ///
    /// 表名是校验过的标识符，不含 `:`，因此不同表的同名 key 不会冲突。
    pub fn cache_key(&self, record: &dyn Record) -> String {
        format!("{}:{}", self.store.table_of(record), record.key())
    }

    /// 读取记录
    ///
    /// 缓存与数据库中均不存在时返回 `CacheError::DataNotExist`。
    #[instrument(skip(self, ctx, record), level = "debug", fields(key = %redact_cache_key(&record.key())))]
    pub async fn get(&self, ctx: &Context, record: &mut dyn Record) -> Result<()> {
        let start = Instant::now();
        let key = self.cache_key(&*record);
        let result = self.get_inner(ctx, &key, record).await;
        GLOBAL_METRICS.record_duration(&self.name, "get", start.elapsed().as_secs_f64());
        if let Err(e) = &result {
            if !e.is_data_not_exist() {
                GLOBAL_METRICS.record_request(&self.name, "get", "error");
            }
        }
        result
    }

    async fn get_inner(&self, ctx: &Context, key: &str, record: &mut dyn Record) -> Result<()> {
        ctx.check()?;
        if self.read_cache(ctx, key, record).await? {
            return Ok(());
        }

        if let Some(single_flight) = &self.single_flight {
            match single_flight.begin(key) {
                Flight::Leader(_guard) => return self.load(ctx, key, record).await,
                Flight::Follower(rx) => {
                    debug!("Waiting for in-flight load: key={}", key);
                    SingleFlight::wait(ctx, rx).await?;
                    if self.read_cache(ctx, key, record).await? {
                        return Ok(());
                    }
                }
            }
        }

        self.load(ctx, key, record).await
    }

    /// 读缓存，命中并填充记录时返回 true
    async fn read_cache(&self, ctx: &Context, key: &str, record: &mut dyn Record) -> Result<bool> {
        match ctx.run(self.cache.get(ctx, key)).await {
            Ok(value) if value == NULL_DATA => {
                GLOBAL_METRICS.record_request(&self.name, "get", "negative_hit");
                debug!("Negative cache hit: key={}", key);
                Err(CacheError::DataNotExist)
            }
            Ok(value) => match record.read(&value) {
                Ok(()) => {
                    GLOBAL_METRICS.record_request(&self.name, "get", "cache_hit");
                    Ok(true)
                }
                Err(e) => {
                    // 无法解码的缓存项按未命中处理，删除后回源
                    warn!(
                        "Dropping undecodable cache entry: key={}, error={}",
                        redact_cache_key(key),
                        e
                    );
                    GLOBAL_METRICS.record_request(&self.name, "get", "cache_corrupt");
                    if let Err(e) = ctx.run(self.cache.del(ctx, key)).await {
                        if e.is_canceled() {
                            return Err(e);
                        }
                        warn!(
                            "Failed to drop undecodable cache entry: key={}, error={}",
                            redact_cache_key(key),
                            e
                        );
                    }
                    Ok(false)
                }
            },
            Err(CacheError::CacheMiss) => Ok(false),
            Err(e) if e.is_canceled() => Err(e),
            Err(e) => {
                warn!(
                    "Cache read failed, falling back to store: key={}, error={}",
                    redact_cache_key(key),
                    e
                );
                GLOBAL_METRICS.record_request(&self.name, "get", "cache_fault");
                Ok(false)
            }
        }
    }

    /// 回源数据库并尽力回填缓存
    async fn load(&self, ctx: &Context, key: &str, record: &mut dyn Record) -> Result<()> {
        match ctx.run(self.store.get(ctx, record)).await {
            Ok(()) => {
                GLOBAL_METRICS.record_request(&self.name, "get", "store_hit");
                match encode_payload(&*record) {
                    Ok(payload) => {
                        self.populate(ctx, key, &payload, self.policy.positive_ttl_secs)
                            .await
                    }
                    Err(e) => warn!(
                        "Skip populating unencodable record: key={}, error={}",
                        redact_cache_key(key),
                        e
                    ),
                }
                Ok(())
            }
            Err(CacheError::NotFound) => {
                GLOBAL_METRICS.record_request(&self.name, "get", "store_miss");
                self.populate(ctx, key, NULL_DATA, self.policy.negative_ttl_secs)
                    .await;
                Err(CacheError::DataNotExist)
            }
            Err(e) => Err(e),
        }
    }

    /// 尽力回填，失败只记录日志
    async fn populate(&self, ctx: &Context, key: &str, value: &str, expire_seconds: u64) {
        if ctx.is_done() {
            debug!("Context done, skip populating: key={}", key);
            GLOBAL_METRICS.record_request(&self.name, "populate", "canceled");
            return;
        }
        match ctx
            .run(self.cache.put_when_enable(ctx, key, value, expire_seconds))
            .await
        {
            Ok(true) => {
                GLOBAL_METRICS.record_request(&self.name, "populate", "written");
            }
            Ok(false) => {
                debug!("Cache disabled, skip populating: key={}", key);
                GLOBAL_METRICS.record_request(&self.name, "populate", "skipped");
            }
            Err(e) => {
                warn!(
                    "Cache population failed: key={}, error={}",
                    redact_cache_key(key),
                    e
                );
                GLOBAL_METRICS.record_request(&self.name, "populate", "failed");
            }
        }
    }

    /// 写入记录：先写数据库，成功后删除缓存
    #[instrument(skip(self, ctx, record), level = "debug", fields(key = %redact_cache_key(&record.key())))]
    pub async fn put(&self, ctx: &Context, record: &dyn Record) -> Result<()> {
        let start = Instant::now();
        let key = self.cache_key(record);
        let result = self.write_through(ctx, &key, record).await;
        GLOBAL_METRICS.record_duration(&self.name, "put", start.elapsed().as_secs_f64());
        GLOBAL_METRICS.record_request(
            &self.name,
            "put",
            if result.is_ok() { "ok" } else { "error" },
        );
        result
    }

    async fn write_through(&self, ctx: &Context, key: &str, record: &dyn Record) -> Result<()> {
        encode_payload(record)?;
        ctx.run(self.store.put(ctx, record)).await?;
        if let Err(e) = ctx.run(self.cache.del(ctx, key)).await {
            error!(
                "Cache invalidation failed after store write: key={}, error={}",
                redact_cache_key(key),
                e
            );
            return Err(e);
        }
        Ok(())
    }

    /// 带禁用窗口的写入
    ///
    /// 写入期间禁用读流程回填，写完后延迟启用，防止并发读把旧值写回缓存。
    /// 任一步骤失败时禁用标记保留，到期后自动恢复。
    #[instrument(skip(self, ctx, record), level = "debug", fields(key = %redact_cache_key(&record.key())))]
    pub async fn put_fenced(&self, ctx: &Context, record: &dyn Record) -> Result<()> {
        let key = self.cache_key(record);
        encode_payload(record)?;
        ctx.run(
            self.cache
                .disable(ctx, &key, self.policy.disable_expire_secs),
        )
        .await?;
        let result = async {
            self.write_through(ctx, &key, record).await?;
            ctx.run(self.cache.enable(ctx, &key, self.policy.enable_delay_ms))
                .await
        }
        .await;
        GLOBAL_METRICS.record_request(
            &self.name,
            "put_fenced",
            if result.is_ok() { "ok" } else { "error" },
        );
        result
    }

    /// 按默认延迟启用记录的读流程回填
    pub async fn enable(&self, ctx: &Context, record: &dyn Record) -> Result<()> {
        self.enable_with_delay(ctx, record, self.policy.enable_delay_ms)
            .await
    }

    #[instrument(skip(self, ctx, record), level = "debug", fields(key = %redact_cache_key(&record.key())))]
    pub async fn enable_with_delay(
        &self,
        ctx: &Context,
        record: &dyn Record,
        delay_millis: u64,
    ) -> Result<()> {
        let key = self.cache_key(record);
        ctx.run(self.cache.enable(ctx, &key, delay_millis)).await
    }

    /// 按默认兜底过期时间禁用记录的读流程回填
    pub async fn disable(&self, ctx: &Context, record: &dyn Record) -> Result<()> {
        self.disable_for(ctx, record, self.policy.disable_expire_secs)
            .await
    }

    #[instrument(skip(self, ctx, record), level = "debug", fields(key = %redact_cache_key(&record.key())))]
    pub async fn disable_for(
        &self,
        ctx: &Context,
        record: &dyn Record,
        expire_seconds: u64,
    ) -> Result<()> {
        let key = self.cache_key(record);
        ctx.run(self.cache.disable(ctx, &key, expire_seconds)).await
    }

    /// 删除记录对应的缓存项
    #[instrument(skip(self, ctx, record), level = "debug", fields(key = %redact_cache_key(&record.key())))]
    pub async fn invalidate(&self, ctx: &Context, record: &dyn Record) -> Result<()> {
        let key = self.cache_key(record);
        let result = ctx.run(self.cache.del(ctx, &key)).await;
        GLOBAL_METRICS.record_request(
            &self.name,
            "invalidate",
            if result.is_ok() { "ok" } else { "error" },
        );
        result
    }
}
