//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 回源合并集成测试

#[path = "../common/mod.rs"]
mod common;

use async_trait::async_trait;
use common::setup_logging;
use consistent_cache::{
    CacheStore, ConsistentCache, Context, MemoryCache, MemoryRows, PersistentStore, RawRecord,
    Record, RecordStore, Result,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

/// 统计读取次数且读取较慢的数据库
struct SlowCountingStore {
    inner: RecordStore<MemoryRows>,
    reads: AtomicUsize,
}

#[async_trait]
impl PersistentStore for SlowCountingStore {
    async fn put(&self, ctx: &Context, record: &dyn Record) -> Result<()> {
        self.inner.put(ctx, record).await
    }

    async fn get(&self, ctx: &Context, record: &mut dyn Record) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.inner.get(ctx, record).await
    }
}

async fn hammer(single_flight: bool, disable_first: bool) -> (usize, Arc<MemoryCache>) {
    setup_logging();
    let cache = Arc::new(MemoryCache::new(100));
    let store = Arc::new(SlowCountingStore {
        inner: RecordStore::new(MemoryRows::new(), "records"),
        reads: AtomicUsize::new(0),
    });
    store
        .put(&Context::new(), &RawRecord::new("id", "hot_key").with_payload("v"))
        .await
        .unwrap();

    let cc = ConsistentCache::new(cache.clone(), store.clone()).with_single_flight(single_flight);
    if disable_first {
        cc.disable_for(&Context::new(), &RawRecord::new("id", "hot_key"), 60)
            .await
            .unwrap();
    }

    let barrier = Arc::new(Barrier::new(10));
    let mut handles = Vec::new();
    for _ in 0..10 {
        let cc = cc.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let mut rec = RawRecord::new("id", "hot_key");
            cc.get(&Context::new(), &mut rec).await.map(|_| rec)
        }));
    }
    for h in handles {
        let rec = h.await.unwrap().unwrap();
        assert_eq!(rec.payload(), "v");
    }

    (store.reads.load(Ordering::SeqCst), cache)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_flight_collapses_concurrent_misses() {
    let (reads, cache) = hammer(true, false).await;
    assert_eq!(reads, 1, "只应有一次回源");
    assert_eq!(cache.get(&Context::new(), "records:hot_key").await.unwrap(), "v");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_without_single_flight_every_miss_reads_store() {
    let (reads, _) = hammer(false, false).await;
    assert!(reads > 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_followers_fall_back_when_population_disabled() {
    let (reads, cache) = hammer(true, true).await;
    // 领导者无法回填，等待者只能自行回源
    assert!(reads > 1);
    assert!(cache
        .get(&Context::new(), "records:hot_key")
        .await
        .unwrap_err()
        .is_cache_miss());
}
