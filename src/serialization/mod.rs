//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了记录负载的编解码契约。记录实现通过它把自身转换为字符串负载。

pub mod json;

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};

pub use json::JsonCodec;

/// 编解码器特征
///
/// `encode` 必须是确定性的，且 `decode(encode(v))` 能还原出等价的值。
pub trait Codec: Send + Sync {
    /// 将值编码为字符串负载
    fn encode<T: Serialize>(&self, value: &T) -> Result<String>;

    /// 从字符串负载解码值
    fn decode<T: DeserializeOwned>(&self, body: &str) -> Result<T>;
}
