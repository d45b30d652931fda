//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! upsert 冲突回退路径测试

#[path = "../common/mod.rs"]
mod common;

use async_trait::async_trait;
use common::setup_logging;
use consistent_cache::store::{InsertOutcome, RowBackend};
use consistent_cache::{
    CacheError, Context, MemoryRows, PersistentStore, RawRecord, RecordStore, Result,
};
use futures::future::join_all;
use std::sync::{Arc, Mutex};

/// 在插入前让另一个写入者抢先写入
struct RacingRows {
    inner: MemoryRows,
    interloper: Mutex<Option<String>>,
}

/// 插入总是报告冲突，但行并不存在（冲突与更新之间被并发删除）
struct VanishingRows {
    inner: MemoryRows,
}

#[async_trait]
impl RowBackend for RacingRows {
    async fn insert(
        &self,
        ctx: &Context,
        table: &str,
        key_column: &str,
        key: &str,
        payload: &str,
    ) -> Result<InsertOutcome> {
        let early = self.interloper.lock().unwrap().take();
        if let Some(other) = early {
            self.inner
                .insert(ctx, table, key_column, key, &other)
                .await?;
        }
        self.inner.insert(ctx, table, key_column, key, payload).await
    }

    async fn update(
        &self,
        ctx: &Context,
        table: &str,
        key_column: &str,
        key: &str,
        payload: &str,
    ) -> Result<u64> {
        self.inner.update(ctx, table, key_column, key, payload).await
    }

    async fn select(
        &self,
        ctx: &Context,
        table: &str,
        key_column: &str,
        key: &str,
    ) -> Result<Option<String>> {
        self.inner.select(ctx, table, key_column, key).await
    }

    async fn delete(&self, ctx: &Context, table: &str, key_column: &str, key: &str) -> Result<u64> {
        self.inner.delete(ctx, table, key_column, key).await
    }
}

#[async_trait]
impl RowBackend for VanishingRows {
    async fn insert(
        &self,
        _ctx: &Context,
        _table: &str,
        _key_column: &str,
        _key: &str,
        _payload: &str,
    ) -> Result<InsertOutcome> {
        Ok(InsertOutcome::DuplicateKey)
    }

    async fn update(
        &self,
        ctx: &Context,
        table: &str,
        key_column: &str,
        key: &str,
        payload: &str,
    ) -> Result<u64> {
        self.inner.update(ctx, table, key_column, key, payload).await
    }

    async fn select(
        &self,
        ctx: &Context,
        table: &str,
        key_column: &str,
        key: &str,
    ) -> Result<Option<String>> {
        self.inner.select(ctx, table, key_column, key).await
    }

    async fn delete(&self, ctx: &Context, table: &str, key_column: &str, key: &str) -> Result<u64> {
        self.inner.delete(ctx, table, key_column, key).await
    }
}

#[tokio::test]
async fn test_losing_insert_falls_back_to_update() {
    setup_logging();
    let rows = MemoryRows::new();
    let store = RecordStore::new(
        RacingRows {
            inner: rows.clone(),
            interloper: Mutex::new(Some("first".to_string())),
        },
        "records",
    );

    store
        .put(&Context::new(), &RawRecord::new("id", "k").with_payload("last"))
        .await
        .unwrap();
    assert_eq!(rows.row_count("records"), 1);
    assert_eq!(rows.row("records", "k").as_deref(), Some("last"));
}

#[tokio::test]
async fn test_zero_row_update_is_store_error() {
    setup_logging();
    let store = RecordStore::new(
        VanishingRows {
            inner: MemoryRows::new(),
        },
        "records",
    );

    let err = store
        .put(&Context::new(), &RawRecord::new("id", "k").with_payload("v"))
        .await
        .unwrap_err();
    match err {
        CacheError::Store(msg) => assert!(msg.contains("zero rows")),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_writers_leave_one_row() {
    setup_logging();
    let rows = MemoryRows::new();
    let store = Arc::new(RecordStore::new(rows.clone(), "records"));

    let writers = (0..16).map(|i| {
        let store = store.clone();
        tokio::spawn(async move {
            let rec = RawRecord::new("id", "hot").with_payload(format!("v{}", i));
            store.put(&Context::new(), &rec).await
        })
    });
    for result in join_all(writers).await {
        result.unwrap().unwrap();
    }

    assert_eq!(rows.row_count("records"), 1);
    let payload = rows.row("records", "hot").unwrap();
    assert!(payload.starts_with('v'));
}
