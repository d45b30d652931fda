//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Redis连接提供者接口和默认实现。

use crate::config::{RedisConfig, RedisMode};
use crate::error::{CacheError, Result};
use crate::utils::redaction::redact_connection_string;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::cluster_async::ClusterConnection;
use redis::{Client, FromRedisValue, RedisResult};
use secrecy::ExposeSecret;
use tokio::time::{timeout, Duration};

/// 已建立的Redis连接
///
/// 两种连接都可以廉价克隆，每条命令使用一个克隆。
#[derive(Clone)]
pub enum RedisConnection {
    Standalone(ConnectionManager),
    Cluster(ClusterConnection),
}

impl std::fmt::Debug for RedisConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standalone(_) => write!(f, "RedisConnection::Standalone"),
            Self::Cluster(_) => write!(f, "RedisConnection::Cluster"),
        }
    }
}

impl RedisConnection {
    pub async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> RedisResult<T> {
        match self {
            Self::Standalone(manager) => cmd.query_async(&mut manager.clone()).await,
            Self::Cluster(conn) => cmd.query_async(&mut conn.clone()).await,
        }
    }

    pub async fn invoke<T: FromRedisValue>(
        &self,
        invocation: &redis::ScriptInvocation<'_>,
    ) -> RedisResult<T> {
        match self {
            Self::Standalone(manager) => invocation.invoke_async(&mut manager.clone()).await,
            Self::Cluster(conn) => invocation.invoke_async(&mut conn.clone()).await,
        }
    }
}

#[async_trait]
pub trait RedisProvider: Send + Sync {
    async fn connect(&self, config: &RedisConfig) -> Result<RedisConnection>;
}

pub struct DefaultRedisProvider;

impl DefaultRedisProvider {
    async fn standalone(&self, config: &RedisConfig) -> Result<RedisConnection> {
        let raw = config.connection_string.expose_secret();
        let connection_string = if config.enable_tls && !raw.starts_with("rediss://") {
            raw.replace("redis://", "rediss://")
        } else {
            raw.to_string()
        };

        let client = Client::open(connection_string.as_str())?;
        let manager = timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        .map_err(|_| {
            CacheError::Timeout(format!(
                "Connection timed out after {}ms. Target: {}",
                config.connection_timeout_ms,
                redact_connection_string(&connection_string)
            ))
        })??;
        Ok(RedisConnection::Standalone(manager))
    }

    async fn cluster(&self, config: &RedisConfig) -> Result<RedisConnection> {
        let cluster_config = config.cluster.as_ref().ok_or_else(|| {
            CacheError::ConfigError("Cluster configuration is missing".to_string())
        })?;

        let mut builder = redis::cluster::ClusterClient::builder(cluster_config.nodes.clone());
        if let Some(password) = &config.password {
            builder = builder.password(password.expose_secret().to_string());
        }
        let client = builder.build()?;

        let conn = timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_async_connection(),
        )
        .await
        .map_err(|_| {
            CacheError::Timeout(format!(
                "Cluster connection timed out after {}ms",
                config.connection_timeout_ms
            ))
        })??;
        Ok(RedisConnection::Cluster(conn))
    }

    async fn sentinel(&self, config: &RedisConfig) -> Result<RedisConnection> {
        let sentinel_config = config.sentinel.as_ref().ok_or_else(|| {
            CacheError::ConfigError("Sentinel configuration is missing".to_string())
        })?;

        // redis+sentinel://[:password@]host:port[,host:port]/service_name
        let mut url = "redis+sentinel://".to_string();
        if let Some(password) = &config.password {
            url.push_str(&format!(":{}@", password.expose_secret()));
        }

        let nodes: Vec<&str> = sentinel_config
            .nodes
            .iter()
            .map(|n| {
                n.trim_start_matches("redis://")
                    .trim_start_matches("redis+sentinel://")
            })
            .collect();
        if nodes.is_empty() {
            return Err(CacheError::ConfigError(
                "No sentinel nodes provided".to_string(),
            ));
        }
        url.push_str(&nodes.join(","));
        url.push('/');
        url.push_str(&sentinel_config.master_name);

        tracing::info!(
            "Connecting through sentinel: {}",
            redact_connection_string(&url)
        );
        let client = Client::open(url)?;
        let manager = timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        .map_err(|_| {
            CacheError::Timeout(format!(
                "Sentinel connection timed out after {}ms",
                config.connection_timeout_ms
            ))
        })??;
        Ok(RedisConnection::Standalone(manager))
    }
}

#[async_trait]
impl RedisProvider for DefaultRedisProvider {
    async fn connect(&self, config: &RedisConfig) -> Result<RedisConnection> {
        match config.mode {
            RedisMode::Standalone => self.standalone(config).await,
            RedisMode::Cluster => self.cluster(config).await,
            RedisMode::Sentinel => self.sentinel(config).await,
        }
    }
}
