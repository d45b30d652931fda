//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于内存的缓存实现，使用Moka作为底层缓存库。

use super::{ensure_bounded, CacheStore};
use crate::context::Context;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// 内存缓存实现
///
/// 数据项和禁用标记分别存放，每一项都带有自己的过期时刻，
/// 到期后由Moka自行清除，不会占用容量。
/// 只有数据项受容量限制；禁用标记不参与淘汰，一次成功的 `disable`
/// 在到期前始终有效。
///
/// `put_when_enable` 先检查禁用标记再写入，两步之间没有锁：
/// 若一次 `disable` 恰好落在检查与写入之间，这次写入仍会发生。
/// 调用方应配合 `del` 与带延迟的 `enable` 收敛这一窗口。
#[derive(Clone)]
pub struct MemoryCache {
    // 值: (数据, 过期时间)
    entries: Cache<String, (String, Instant)>,
    // 值: 禁用标记过期时间
    markers: Cache<String, Instant>,
}

impl MemoryCache {
    /// 创建新的内存缓存实例
    ///
    /// # 参数
    ///
    /// * `capacity` - 最大条目数
    pub fn new(capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .expire_after(UntilDeadline)
                .build(),
            markers: Cache::builder().expire_after(UntilDeadline).build(),
        }
    }

    /// 数据项剩余生存时间（秒，向上取整），不存在时返回None
    pub async fn ttl(&self, key: &str) -> Option<u64> {
        let (_, expire_at) = self.entries.get(key).await?;
        let remaining = expire_at.checked_duration_since(Instant::now())?;
        Some(ceil_secs(remaining))
    }

    /// key 当前是否处于禁用状态
    pub async fn is_disabled(&self, key: &str) -> bool {
        self.live_marker(key).await.is_some()
    }

    async fn live_marker(&self, key: &str) -> Option<Instant> {
        let expire_at = self.markers.get(key).await?;
        if Instant::now() >= expire_at {
            self.markers.remove(key).await;
            debug!("Memory marker expired: key={}", key);
            return None;
        }
        Some(expire_at)
    }
}

/// 带有过期时刻的缓存值
trait Deadline {
    fn deadline(&self) -> Instant;
}

impl Deadline for Instant {
    fn deadline(&self) -> Instant {
        *self
    }
}

impl Deadline for (String, Instant) {
    fn deadline(&self) -> Instant {
        self.1
    }
}

/// 按值中记录的过期时刻过期，覆盖写入时重新计算
struct UntilDeadline;

impl<V: Deadline> Expiry<String, V> for UntilDeadline {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &V,
        created_at: Instant,
    ) -> Option<Duration> {
        Some(value.deadline().saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &V,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.deadline().saturating_duration_since(updated_at))
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    #[instrument(skip(self, ctx), level = "debug")]
    async fn enable(&self, ctx: &Context, key: &str, delay_millis: u64) -> Result<()> {
        ctx.check()?;
        let Some(expire_at) = self.live_marker(key).await else {
            debug!("Memory enable: key={} already enabled", key);
            return Ok(());
        };

        if delay_millis == 0 {
            self.markers.remove(key).await;
            debug!("Memory enable: key={} marker removed", key);
            return Ok(());
        }

        let delayed = Instant::now() + Duration::from_millis(delay_millis);
        if delayed < expire_at {
            self.markers.insert(key.to_string(), delayed).await;
        }
        debug!(
            "Memory enable: key={} re-enabled after {}ms",
            key, delay_millis
        );
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    async fn disable(&self, ctx: &Context, key: &str, expire_seconds: u64) -> Result<()> {
        ctx.check()?;
        ensure_bounded("disable", key, expire_seconds)?;
        let expire_at = Instant::now() + Duration::from_secs(expire_seconds);
        self.markers.insert(key.to_string(), expire_at).await;
        debug!(
            "Memory disable: key={}, expire_seconds={}",
            key, expire_seconds
        );
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    async fn get(&self, ctx: &Context, key: &str) -> Result<String> {
        ctx.check()?;
        match self.entries.get(key).await {
            Some((value, expire_at)) => {
                if Instant::now() >= expire_at {
                    self.entries.remove(key).await;
                    debug!("Memory get: key={}, expired=true, removed", key);
                    return Err(CacheError::CacheMiss);
                }
                debug!("Memory get: key={}, found=true", key);
                Ok(value)
            }
            None => {
                debug!("Memory get: key={}, found=false", key);
                Err(CacheError::CacheMiss)
            }
        }
    }

    #[instrument(skip(self, ctx), level = "debug")]
    async fn del(&self, ctx: &Context, key: &str) -> Result<()> {
        ctx.check()?;
        self.entries.remove(key).await;
        debug!("Memory del: key={} 删除完成", key);
        Ok(())
    }

    #[instrument(skip(self, ctx, value), level = "debug", fields(value_len = value.len()))]
    async fn put_when_enable(
        &self,
        ctx: &Context,
        key: &str,
        value: &str,
        expire_seconds: u64,
    ) -> Result<bool> {
        ctx.check()?;
        ensure_bounded("put_when_enable", key, expire_seconds)?;
        if self.live_marker(key).await.is_some() {
            debug!("Memory put_when_enable: key={} disabled, skipped", key);
            return Ok(false);
        }
        let expire_at = Instant::now() + Duration::from_secs(expire_seconds);
        self.entries
            .insert(key.to_string(), (value.to_string(), expire_at))
            .await;
        debug!(
            "Memory put_when_enable: key={}, expire_seconds={} 插入完成",
            key, expire_seconds
        );
        Ok(true)
    }
}
