//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 基于SQLite的数据库后端集成测试

#[path = "../common/mod.rs"]
mod common;

use common::setup_logging;
use consistent_cache::config::{StoreBackend, StoreConfig};
use consistent_cache::{
    ConsistentCache, Context, MemoryCache, PersistentStore, RawRecord, RecordStore, SeaOrmRows,
};
use std::sync::Arc;

fn file_config(dir: &tempfile::TempDir) -> StoreConfig {
    let path = dir.path().join("data").join("records.db");
    StoreConfig {
        backend: StoreBackend::Sql,
        connection_string: format!("sqlite://{}", path.display()).into(),
        max_connections: 4,
        ..StoreConfig::default()
    }
}

#[tokio::test]
async fn test_file_database_round_trip() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir);

    let rows = SeaOrmRows::connect(&config).await.unwrap();
    rows.ensure_table("records", "id").await.unwrap();
    rows.ensure_table("users", "user_id").await.unwrap();
    let store = RecordStore::new(rows, "records");
    let ctx = Context::new();

    store
        .put(&ctx, &RawRecord::new("id", "a").with_payload("1"))
        .await
        .unwrap();
    store
        .put(
            &ctx,
            &RawRecord::new("user_id", "a").with_table("users").with_payload("2"),
        )
        .await
        .unwrap();

    let mut plain = RawRecord::new("id", "a");
    store.get(&ctx, &mut plain).await.unwrap();
    assert_eq!(plain.payload(), "1");

    let mut named = RawRecord::new("user_id", "a").with_table("users");
    store.get(&ctx, &mut named).await.unwrap();
    assert_eq!(named.payload(), "2");
}

#[tokio::test]
async fn test_data_survives_reconnect() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir);
    let ctx = Context::new();

    {
        let rows = SeaOrmRows::connect(&config).await.unwrap();
        rows.ensure_table("records", "id").await.unwrap();
        RecordStore::new(rows, "records")
            .put(&ctx, &RawRecord::new("id", "persist").with_payload("kept"))
            .await
            .unwrap();
    }

    let rows = SeaOrmRows::connect(&config).await.unwrap();
    let store = RecordStore::new(rows, "records");
    let mut target = RawRecord::new("id", "persist");
    store.get(&ctx, &mut target).await.unwrap();
    assert_eq!(target.payload(), "kept");
}

#[tokio::test]
async fn test_concurrent_upserts_leave_one_row() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let rows = SeaOrmRows::connect(&file_config(&dir)).await.unwrap();
    rows.ensure_table("records", "id").await.unwrap();
    let store = Arc::new(RecordStore::new(rows, "records"));

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let rec = RawRecord::new("id", "hot").with_payload(format!("v{}", i));
            store.put(&Context::new(), &rec).await
        }));
    }
    for h in handles {
        // SQLite写锁竞争可能导致个别写入失败，但绝不能产生重复行
        let _ = h.await.unwrap();
    }

    let mut target = RawRecord::new("id", "hot");
    store.get(&Context::new(), &mut target).await.unwrap();
    assert!(target.payload().starts_with('v'));
    store
        .put(&Context::new(), &RawRecord::new("id", "hot").with_payload("final"))
        .await
        .unwrap();
    assert!(store.delete(&Context::new(), &target).await.unwrap());
    assert!(!store.delete(&Context::new(), &target).await.unwrap());
}

#[tokio::test]
async fn test_coordinator_over_sqlite() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let rows = SeaOrmRows::connect(&file_config(&dir)).await.unwrap();
    rows.ensure_table("records", "id").await.unwrap();

    let cc = ConsistentCache::new(
        Arc::new(MemoryCache::new(100)),
        Arc::new(RecordStore::new(rows, "records")),
    );
    let ctx = Context::new();

    let mut target = RawRecord::new("id", "u:42");
    assert!(cc.get(&ctx, &mut target).await.unwrap_err().is_data_not_exist());

    cc.put(&ctx, &RawRecord::new("id", "u:42").with_payload("{\"a\":1}"))
        .await
        .unwrap();
    cc.get(&ctx, &mut target).await.unwrap();
    assert_eq!(target.payload(), "{\"a\":1}");
}
