//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的缓存实现。

use super::redis_provider::{DefaultRedisProvider, RedisConnection, RedisProvider};
use super::{data_key, disable_key, ensure_bounded, CacheStore};
use crate::config::RedisConfig;
use crate::context::Context;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, instrument};

lazy_static! {
    // KEYS[1] = 禁用标记, KEYS[2] = 数据项; ARGV[1] = 值, ARGV[2] = 过期秒数
    static ref PUT_WHEN_ENABLE: redis::Script = redis::Script::new(
        r#"
        if redis.call('EXISTS', KEYS[1]) == 1 then
            return 0
        end
        redis.call('SET', KEYS[2], ARGV[1], 'EX', ARGV[2])
        return 1
        "#,
    );

    // 只缩短禁用标记的剩余寿命，从不延长
    static ref DELAYED_ENABLE: redis::Script = redis::Script::new(
        r#"
        local pttl = redis.call('PTTL', KEYS[1])
        if pttl == -2 then
            return 0
        end
        if pttl == -1 or pttl > tonumber(ARGV[1]) then
            redis.call('PEXPIRE', KEYS[1], ARGV[1])
        end
        return 1
        "#,
    );
}

/// Redis缓存实现
///
/// 数据项存放在 `{prefix}:{key}`，禁用标记存放在 `{prefix}:disable:{key}`。
/// 标记检查与写入在同一个Lua脚本中完成。
#[derive(Clone)]
pub struct RedisCache {
    conn: RedisConnection,
    prefix: String,
    command_timeout_ms: u64,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("conn", &self.conn)
            .field("prefix", &self.prefix)
            .field("command_timeout_ms", &self.command_timeout_ms)
            .finish()
    }
}

impl RedisCache {
    /// 创建新的Redis缓存实例
    ///
    /// # 参数
    ///
    /// * `config` - Redis配置
    /// * `prefix` - 键前缀
    #[instrument(skip(config), level = "info", name = "init_redis_cache")]
    pub async fn new(config: &RedisConfig, prefix: &str) -> Result<Self> {
        Self::new_with_provider(config, prefix, Arc::new(DefaultRedisProvider)).await
    }

    /// 使用指定的连接提供者创建Redis缓存实例
    #[instrument(skip(config, provider), level = "info", fields(mode = ?config.mode))]
    pub async fn new_with_provider(
        config: &RedisConfig,
        prefix: &str,
        provider: Arc<dyn RedisProvider>,
    ) -> Result<Self> {
        let conn = provider.connect(config).await?;
        Ok(Self::from_connection(
            conn,
            prefix,
            config.command_timeout_ms,
        ))
    }

    pub fn from_connection(conn: RedisConnection, prefix: &str, command_timeout_ms: u64) -> Self {
        Self {
            conn,
            prefix: prefix.to_string(),
            command_timeout_ms,
        }
    }

    /// 在上下文与命令超时的双重约束下执行
    async fn exec<T, F>(&self, ctx: &Context, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        let limit = Duration::from_millis(self.command_timeout_ms);
        ctx.run(async {
            match timeout(limit, fut).await {
                Ok(res) => res.map_err(CacheError::from),
                Err(_) => Err(CacheError::Timeout(format!(
                    "redis {} timed out after {}ms",
                    op, self.command_timeout_ms
                ))),
            }
        })
        .await
    }

    /// 数据项剩余生存时间（秒），不存在或无过期时间时返回None
    #[instrument(skip(self, ctx), level = "debug")]
    pub async fn ttl(&self, ctx: &Context, key: &str) -> Result<Option<u64>> {
        let mut cmd = redis::cmd("TTL");
        cmd.arg(data_key(&self.prefix, key));
        let ttl: i64 = self.exec(ctx, "ttl", self.conn.query(&cmd)).await?;
        Ok(u64::try_from(ttl).ok().filter(|t| *t > 0))
    }

    /// key 当前是否处于禁用状态
    #[instrument(skip(self, ctx), level = "debug")]
    pub async fn is_disabled(&self, ctx: &Context, key: &str) -> Result<bool> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(disable_key(&self.prefix, key));
        self.exec(ctx, "exists", self.conn.query(&cmd)).await
    }

    /// 检查连接是否正常
    #[instrument(skip(self, ctx), level = "debug")]
    pub async fn ping(&self, ctx: &Context) -> Result<()> {
        let cmd = redis::cmd("PING");
        let response: String = self.exec(ctx, "ping", self.conn.query(&cmd)).await?;
        debug!("RedisCache ping: {}", response);
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    #[instrument(skip(self, ctx), level = "debug")]
    async fn enable(&self, ctx: &Context, key: &str, delay_millis: u64) -> Result<()> {
        let marker = disable_key(&self.prefix, key);
        if delay_millis == 0 {
            let mut cmd = redis::cmd("DEL");
            cmd.arg(&marker);
            let _: i64 = self.exec(ctx, "del", self.conn.query(&cmd)).await?;
            debug!("Redis enable: key={} marker removed", key);
            return Ok(());
        }

        let mut invocation = DELAYED_ENABLE.prepare_invoke();
        invocation.key(&marker).arg(delay_millis);
        let existed: i64 = self
            .exec(ctx, "enable", self.conn.invoke(&invocation))
            .await?;
        debug!(
            "Redis enable: key={}, delay_millis={}, had_marker={}",
            key,
            delay_millis,
            existed == 1
        );
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    async fn disable(&self, ctx: &Context, key: &str, expire_seconds: u64) -> Result<()> {
        ensure_bounded("disable", key, expire_seconds)?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(disable_key(&self.prefix, key))
            .arg(1)
            .arg("EX")
            .arg(expire_seconds);
        let _: () = self.exec(ctx, "disable", self.conn.query(&cmd)).await?;
        debug!(
            "Redis disable: key={}, expire_seconds={}",
            key, expire_seconds
        );
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    async fn get(&self, ctx: &Context, key: &str) -> Result<String> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(data_key(&self.prefix, key));
        let value: Option<String> = self.exec(ctx, "get", self.conn.query(&cmd)).await?;
        match value {
            Some(v) => {
                debug!("Redis get: key={}, found=true", key);
                Ok(v)
            }
            None => {
                debug!("Redis get: key={}, found=false", key);
                Err(CacheError::CacheMiss)
            }
        }
    }

    #[instrument(skip(self, ctx), level = "debug")]
    async fn del(&self, ctx: &Context, key: &str) -> Result<()> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(data_key(&self.prefix, key));
        let removed: i64 = self.exec(ctx, "del", self.conn.query(&cmd)).await?;
        debug!("Redis del: key={}, removed={}", key, removed);
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
        ensure_bounded("put_when_enable", key, expire_seconds)?;
        let mut invocation = PUT_WHEN_ENABLE.prepare_invoke();
        invocation
            .key(disable_key(&self.prefix, key))
            .key(data_key(&self.prefix, key))
            .arg(value)
            .arg(expire_seconds);
        let written: i64 = self
            .exec(ctx, "put_when_enable", self.conn.invoke(&invocation))
            .await?;
        debug!(
            "Redis put_when_enable: key={}, written={}",
            key,
            written == 1
        );
        Ok(written == 1)
    }
}
