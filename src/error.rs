//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了一致性缓存的错误类型和处理机制。

use thiserror::Error;

/// 一致性缓存错误类型枚举
///
/// `CacheMiss`、`NotFound` 是内部信号，`DataNotExist` 是返回给调用方的正常结果，
/// 其余为真正的故障。
#[derive(Error, Debug)]
pub enum CacheError {
    /// 缓存中不存在该键，触发回源
    #[error("cache miss")]
    CacheMiss,

    /// 缓存与数据库中均确认不存在
    #[error("data not exist")]
    DataNotExist,

    /// 数据库中没有匹配的记录
    #[error("db miss")]
    NotFound,

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 存储后端错误
    #[error("Store error: {0}")]
    Store(String),

    /// Sea-ORM数据库错误
    #[error("Sea-ORM error: {0}")]
    SeaOrmError(#[from] sea_orm::DbErr),

    /// Redis错误
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// 上下文被取消
    #[error("Operation canceled: {0}")]
    Canceled(String),

    /// 超时错误
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CacheError {
    /// 是否为缓存未命中
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, CacheError::CacheMiss)
    }

    /// 是否为数据确认不存在
    pub fn is_data_not_exist(&self) -> bool {
        matches!(self, CacheError::DataNotExist)
    }

    /// 是否为数据库未命中
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound)
    }

    /// 是否为取消或超时
    pub fn is_canceled(&self) -> bool {
        matches!(self, CacheError::Canceled(_) | CacheError::Timeout(_))
    }

    /// 是否为后端故障（Redis、数据库或其他存储错误）
    pub fn is_backend_fault(&self) -> bool {
        matches!(
            self,
            CacheError::Store(_) | CacheError::SeaOrmError(_) | CacheError::RedisError(_)
        )
    }
}

/// 缓存操作结果类型别名
pub type Result<T> = std::result::Result<T, CacheError>;
