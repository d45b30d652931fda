//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存模块的抽象接口，以及内存与Redis两种实现。

pub mod memory;
pub mod redis_cache;
pub mod redis_provider;

use crate::context::Context;
use crate::error::{CacheError, Result};
use async_trait::async_trait;

pub use self::memory::MemoryCache;
pub use self::redis_cache::RedisCache;

/// 缓存模块的抽象接口
///
/// 缓存只是优化层，任何时刻都可能过期或缺失。
/// 没有禁用标记即视为启用。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 启用某个 key 对应读流程写缓存机制（默认情况下为启用状态）
    ///
    /// `delay_millis` 大于 0 时，禁用标记的剩余寿命被缩短到该值，到期后才真正启用。
    async fn enable(&self, ctx: &Context, key: &str, delay_millis: u64) -> Result<()>;

    /// 禁用某个 key 对应读流程写缓存机制，`expire_seconds` 后自动恢复启用
    async fn disable(&self, ctx: &Context, key: &str, expire_seconds: u64) -> Result<()>;

    /// 读取 key 对应缓存。不存在时返回 `CacheError::CacheMiss`
    async fn get(&self, ctx: &Context, key: &str) -> Result<String>;

    /// 删除 key 对应缓存，key 不存在时同样成功
    async fn del(&self, ctx: &Context, key: &str) -> Result<()>;

    /// 校验 key 是否启用读流程写缓存，启用时写入并返回 true
    async fn put_when_enable(
        &self,
        ctx: &Context,
        key: &str,
        value: &str,
        expire_seconds: u64,
    ) -> Result<bool>;
}

/// 数据项在后端中的实际键
///
/// 大括号构成Redis哈希标签，使数据项与禁用标记落在同一个槽位。
pub(crate) fn data_key(prefix: &str, key: &str) -> String {
    format!("{}:{{{}}}", prefix, key)
}

/// 禁用标记在后端中的实际键
pub(crate) fn disable_key(prefix: &str, key: &str) -> String {
    format!("{}:disable:{{{}}}", prefix, key)
}

/// 禁用标记与数据项都必须带有有限的过期时间
pub(crate) fn ensure_bounded(op: &str, key: &str, expire_seconds: u64) -> Result<()> {
    if expire_seconds == 0 {
        return Err(CacheError::ConfigError(format!(
            "{} for key {} requires a positive expire_seconds",
            op, key
        )));
    }
    Ok(())
}
