//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了测试的通用工具函数和设置。

use consistent_cache::{ConsistencyPolicy, ConsistentCache, MemoryCache, MemoryRows, RecordStore};
use std::sync::{Arc, Once};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn setup_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(EnvFilter::new("debug"))
            .try_init()
            .ok();
    });
}

/// 生成唯一的键，确保测试之间的隔离
#[allow(dead_code)]
pub fn unique_key(base: &str) -> String {
    format!("{}:{}", base, uuid::Uuid::new_v4().simple())
}

/// 测试使用的Redis地址，优先读取环境变量 `REDIS_URL`
#[allow(dead_code)]
pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// 检查Redis是否可用
#[allow(dead_code)]
pub async fn is_redis_available() -> bool {
    consistent_cache::utils::is_redis_available_url(&redis_url()).await
}

/// 内存后端组成的协调器，同时返回两个后端以便检查内部状态
#[allow(dead_code)]
pub fn memory_coordinator(
    policy: ConsistencyPolicy,
) -> (ConsistentCache, Arc<MemoryCache>, MemoryRows) {
    setup_logging();
    let cache = Arc::new(MemoryCache::new(10_000));
    let rows = MemoryRows::new();
    let store = Arc::new(RecordStore::new(rows.clone(), "records"));
    let cc = ConsistentCache::new(cache.clone(), store)
        .with_name(format!("test_{}", uuid::Uuid::new_v4().simple()))
        .with_policy(policy);
    (cc, cache, rows)
}
