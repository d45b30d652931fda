//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了进程内的行级存储后端。

use super::{InsertOutcome, RowBackend};
use crate::context::Context;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// 进程内行级存储
///
/// 以 (表, 键) 为主键，键列名只参与校验。克隆得到的实例共享同一份数据。
#[derive(Clone, Default)]
pub struct MemoryRows {
    rows: Arc<DashMap<(String, String), String>>,
}

impl MemoryRows {
    pub fn new() -> Self {
        Self::default()
    }

    /// 表中的行数
    pub fn row_count(&self, table: &str) -> usize {
        self.rows.iter().filter(|r| r.key().0 == table).count()
    }

    /// 直接读取某一行的负载
    pub fn row(&self, table: &str, key: &str) -> Option<String> {
        self.rows
            .get(&(table.to_string(), key.to_string()))
            .map(|r| r.value().clone())
    }
}

#[async_trait]
impl RowBackend for MemoryRows {
    async fn insert(
        &self,
        ctx: &Context,
        table: &str,
        _key_column: &str,
        key: &str,
        payload: &str,
    ) -> Result<InsertOutcome> {
        ctx.check()?;
        match self.rows.entry((table.to_string(), key.to_string())) {
            Entry::Occupied(_) => Ok(InsertOutcome::DuplicateKey),
            Entry::Vacant(v) => {
                v.insert(payload.to_string());
                debug!("MemoryRows insert: table={}, key={}", table, key);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn update(
        &self,
        ctx: &Context,
        table: &str,
        _key_column: &str,
        key: &str,
        payload: &str,
    ) -> Result<u64> {
        ctx.check()?;
        match self.rows.get_mut(&(table.to_string(), key.to_string())) {
            Some(mut row) => {
                *row = payload.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn select(
        &self,
        ctx: &Context,
        table: &str,
        _key_column: &str,
        key: &str,
    ) -> Result<Option<String>> {
        ctx.check()?;
        Ok(self.row(table, key))
    }

    async fn delete(
        &self,
        ctx: &Context,
        table: &str,
        _key_column: &str,
        key: &str,
    ) -> Result<u64> {
        ctx.check()?;
        Ok(self
            .rows
            .remove(&(table.to_string(), key.to_string()))
            .map_or(0, |_| 1))
    }
}
