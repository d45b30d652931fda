//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 指标收集集成测试

#[path = "../common/mod.rs"]
mod common;

use common::memory_coordinator;
use consistent_cache::metrics::{get_metrics_string, GLOBAL_METRICS};
use consistent_cache::{ConsistencyPolicy, Context, RawRecord};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_read_path_counters() {
    let (cc, _cache, _rows) = memory_coordinator(ConsistencyPolicy::default());
    let name = cc.name().to_string();
    let ctx = Context::new();

    let mut target = RawRecord::new("id", "m");
    let _ = cc.get(&ctx, &mut target).await;
    let _ = cc.get(&ctx, &mut target).await;
    cc.put(&ctx, &RawRecord::new("id", "m").with_payload("v"))
        .await
        .unwrap();
    cc.get(&ctx, &mut target).await.unwrap();
    cc.get(&ctx, &mut target).await.unwrap();

    assert_eq!(GLOBAL_METRICS.request_count(&name, "get", "store_miss"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(&name, "get", "negative_hit"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(&name, "get", "store_hit"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(&name, "get", "cache_hit"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(&name, "populate", "written"), 2);
    assert_eq!(GLOBAL_METRICS.request_count(&name, "put", "ok"), 1);

    let output = get_metrics_string();
    assert!(output.contains(&format!(
        "consistent_cache_requests_total{{service=\"{}\", op=\"get\", result=\"cache_hit\"}} 1",
        name
    )));
    assert!(output.contains(&format!(
        "consistent_cache_operation_duration_seconds_count{{service=\"{}\", op=\"get\"}} 4",
        name
    )));
}

#[tokio::test]
#[serial]
async fn test_skipped_population_is_counted() {
    let (cc, _cache, _rows) = memory_coordinator(ConsistencyPolicy::default());
    let name = cc.name().to_string();
    let ctx = Context::new();

    cc.put(&ctx, &RawRecord::new("id", "d").with_payload("v"))
        .await
        .unwrap();
    cc.disable(&ctx, &RawRecord::new("id", "d")).await.unwrap();
    let mut target = RawRecord::new("id", "d");
    cc.get(&ctx, &mut target).await.unwrap();

    assert_eq!(GLOBAL_METRICS.request_count(&name, "populate", "skipped"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(&name, "populate", "written"), 0);
}
