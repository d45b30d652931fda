//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了数据库模块的抽象接口，以及基于“先插入、冲突再更新”的upsert实现。

pub mod memory;
pub mod sql;

use crate::context::Context;
use crate::error::{CacheError, Result};
use crate::record::{encode_payload, Record};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, instrument, warn};

pub use self::memory::MemoryRows;
pub use self::sql::SeaOrmRows;

/// 负载所在的列名
pub const PAYLOAD_COLUMN: &str = "payload";

/// 未声明表名的记录默认写入的表
pub const DEFAULT_TABLE: &str = "records";

lazy_static! {
    static ref IDENTIFIER: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("identifier pattern should compile");
}

/// 验证SQL标识符是否安全（防止SQL注入）
///
/// 只能包含字母、数字、下划线，且不能以数字开头，最长64个字符
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if IDENTIFIER.is_match(identifier) {
        Ok(())
    } else {
        Err(CacheError::Store(format!(
            "Invalid identifier '{}': only alphanumeric characters and underscores are allowed",
            identifier
        )))
    }
}

/// 数据库模块的抽象接口
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// 数据写入数据库（upsert），重复写入相同内容是幂等的
    async fn put(&self, ctx: &Context, record: &dyn Record) -> Result<()>;

    /// 从数据库读取数据并填充到 `record`，不存在时返回 `CacheError::NotFound`
    async fn get(&self, ctx: &Context, record: &mut dyn Record) -> Result<()>;

    /// 记录所在的表，协调器以此为缓存 key 划分命名空间
    fn table_of<'a>(&'a self, record: &'a dyn Record) -> &'a str {
        record.as_named().map(|n| n.name()).unwrap_or(DEFAULT_TABLE)
    }
}

/// 插入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// 违反了键上的唯一约束
    DuplicateKey,
}

/// 行级存储后端
///
/// 每条记录对应表 `table` 中的一行：`key_column` 为主键，`payload` 为负载。
#[async_trait]
pub trait RowBackend: Send + Sync {
    async fn insert(
        &self,
        ctx: &Context,
        table: &str,
        key_column: &str,
        key: &str,
        payload: &str,
    ) -> Result<InsertOutcome>;

    /// 返回受影响的行数
    async fn update(
        &self,
        ctx: &Context,
        table: &str,
        key_column: &str,
        key: &str,
        payload: &str,
    ) -> Result<u64>;

    async fn select(
        &self,
        ctx: &Context,
        table: &str,
        key_column: &str,
        key: &str,
    ) -> Result<Option<String>>;

    /// 返回受影响的行数
    async fn delete(&self, ctx: &Context, table: &str, key_column: &str, key: &str)
        -> Result<u64>;
}

/// 基于行级后端的记录存储
///
/// 记录显式声明表名时使用该表，否则使用默认表。
pub struct RecordStore<B> {
    backend: B,
    default_table: String,
}

impl<B: RowBackend> RecordStore<B> {
    pub fn new(backend: B, default_table: impl Into<String>) -> Self {
        Self {
            backend,
            default_table: default_table.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 解析记录所在的表与键列，并校验标识符
    fn locate<'a>(&'a self, record: &'a dyn Record) -> Result<(&'a str, &'a str)> {
        let table = self.table_of(record);
        let key_column = record.key_column();
        validate_identifier(table)?;
        validate_identifier(key_column)?;
        if key_column == PAYLOAD_COLUMN {
            return Err(CacheError::Store(format!(
                "key column cannot be named '{}'",
                PAYLOAD_COLUMN
            )));
        }
        Ok((table, key_column))
    }

    /// 删除记录对应的行，返回是否确实删除了一行
    #[instrument(skip(self, ctx, record), level = "debug", fields(key = %record.key()))]
    pub async fn delete(&self, ctx: &Context, record: &dyn Record) -> Result<bool> {
        let (table, key_column) = self.locate(record)?;
        let affected = ctx
            .run(self.backend.delete(ctx, table, key_column, &record.key()))
            .await?;
        Ok(affected > 0)
    }
}

#[async_trait]
impl<B: RowBackend> PersistentStore for RecordStore<B> {
    /// 通过两个非原子性动作实现 upsert 效果：
    /// 1 尝试插入记录
    /// 2 倘若发生唯一键冲突，则改为执行更新操作
    ///
    /// 更新影响 0 行说明两步之间有并发删除，此时返回 `CacheError::Store`。
    #[instrument(skip(self, ctx, record), level = "debug", fields(key = %record.key()))]
    async fn put(&self, ctx: &Context, record: &dyn Record) -> Result<()> {
        let (table, key_column) = self.locate(record)?;
        let key = record.key();
        let payload = encode_payload(record)?;

        let outcome = ctx
            .run(
                self.backend
                    .insert(ctx, table, key_column, &key, &payload),
            )
            .await?;
        if outcome == InsertOutcome::Inserted {
            debug!("Inserted row: table={}, key={}", table, key);
            return Ok(());
        }

        debug!(
            "Duplicate key on insert, falling back to update: table={}, key={}",
            table, key
        );
        let affected = ctx
            .run(
                self.backend
                    .update(ctx, table, key_column, &key, &payload),
            )
            .await?;
        if affected == 0 {
            warn!(
                "Upsert fallback updated zero rows (concurrent delete?): table={}, key={}",
                table, key
            );
            return Err(CacheError::Store(format!(
                "upsert fallback updated zero rows for {}.{} = {}",
                table, key_column, key
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, ctx, record), level = "debug", fields(key = %record.key()))]
    async fn get(&self, ctx: &Context, record: &mut dyn Record) -> Result<()> {
        let payload = {
            let (table, key_column) = self.locate(&*record)?;
            ctx.run(
                self.backend
                    .select(ctx, table, key_column, &record.key()),
            )
            .await?
        };
        match payload {
            Some(body) => record.read(&body),
            None => Err(CacheError::NotFound),
        }
    }

    fn table_of<'a>(&'a self, record: &'a dyn Record) -> &'a str {
        record
            .as_named()
            .map(|n| n.name())
            .unwrap_or(self.default_table.as_str())
    }
}
