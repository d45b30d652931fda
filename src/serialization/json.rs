//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了JSON编解码器的实现。

use super::Codec;
use crate::error::{CacheError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// JSON编解码器
///
/// 基于serde_json。产生的负载总是合法JSON，因此不会与空值哨兵冲突。
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    /// 序列化值为JSON字符串
    ///
    /// # 参数
    ///
    /// * `value` - 要序列化的值
    ///
    /// # 返回值
    ///
    /// 返回JSON字符串或错误
    fn encode<T: Serialize>(&self, value: &T) -> Result<String> {
        serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// 从JSON字符串反序列化值
    ///
    /// # 参数
    ///
    /// * `body` - JSON字符串
    ///
    /// # 返回值
    ///
    /// 返回反序列化后的值或错误
    fn decode<T: DeserializeOwned>(&self, body: &str) -> Result<T> {
        serde_json::from_str(body).map_err(|e| CacheError::Serialization(e.to_string()))
    }
}
