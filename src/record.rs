//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了记录抽象：一条数据库记录如何标识自己，以及如何与字符串负载互相转换。

use crate::error::{CacheError, Result};
use crate::NULL_DATA;

/// 每次读写操作时操作的一条数据记录
///
/// `key_column` 与 `key` 必须是纯函数，它们会被用来构造查询条件。
/// `write` 必须是确定性的，并满足 `read(write())` 还原出等价状态。
pub trait Record: Send + Sync {
    /// 获取 key 对应的字段名
    fn key_column(&self) -> &str;

    /// 获取 key 对应的值
    fn key(&self) -> String;

    /// 将记录序列化成字符串
    fn write(&self) -> Result<String>;

    /// 读取字符串内容，反序列化到记录实例中
    fn read(&mut self, body: &str) -> Result<()>;

    /// 能力查询：记录是否显式声明了表名
    fn as_named(&self) -> Option<&dyn Named> {
        None
    }
}

/// 记录的可选能力：显式声明所在的表
pub trait Named {
    fn name(&self) -> &str;
}

/// 序列化记录并确保负载不会与空值哨兵冲突
pub(crate) fn encode_payload(record: &dyn Record) -> Result<String> {
    let payload = record.write()?;
    if payload == NULL_DATA {
        return Err(CacheError::Serialization(format!(
            "record {} serialized to the reserved null sentinel",
            record.key()
        )));
    }
    Ok(payload)
}

/// 负载为不透明字符串的记录
///
/// 供命令行工具以及不关心负载结构的调用方使用。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRecord {
    table: Option<String>,
    key_column: String,
    key: String,
    payload: String,
}

impl RawRecord {
    /// 创建一条空负载的记录，通常作为读取目标
    pub fn new(key_column: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: None,
            key_column: key_column.into(),
            key: key.into(),
            payload: String::new(),
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

impl Record for RawRecord {
    fn key_column(&self) -> &str {
        &self.key_column
    }

    fn key(&self) -> String {
        self.key.clone()
    }

    fn write(&self) -> Result<String> {
        Ok(self.payload.clone())
    }

    fn read(&mut self, body: &str) -> Result<()> {
        self.payload = body.to_string();
        Ok(())
    }

    fn as_named(&self) -> Option<&dyn Named> {
        self.table.as_ref().map(|_| self as &dyn Named)
    }
}

impl Named for RawRecord {
    fn name(&self) -> &str {
        self.table.as_deref().unwrap_or_default()
    }
}
