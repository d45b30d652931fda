//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 缓存管理器集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{setup_logging, unique_key};
use consistent_cache::config::StoreBackend;
use consistent_cache::{get_client, CacheError, CacheManager, Config, Context, RawRecord};

#[tokio::test]
async fn test_init_registers_client() {
    setup_logging();
    let name = format!("mgr_{}", uuid::Uuid::new_v4().simple());
    let cc = CacheManager::init(&name, &Config::default()).await.unwrap();
    assert_eq!(cc.name(), name);

    let same = get_client(&name).unwrap();
    let ctx = Context::new();
    same.put(&ctx, &RawRecord::new("id", "k").with_payload("v"))
        .await
        .unwrap();

    let mut target = RawRecord::new("id", "k");
    cc.get(&ctx, &mut target).await.unwrap();
    assert_eq!(target.payload(), "v");

    assert!(matches!(
        get_client(&unique_key("missing")),
        Err(CacheError::ConfigError(_))
    ));
}

#[tokio::test]
async fn test_build_with_sql_store_creates_table() {
    setup_logging();
    let mut config = Config::default();
    config.store.backend = StoreBackend::Sql;
    config.consistency.single_flight = true;

    let cc = CacheManager::build("sql", &config).await.unwrap();
    let ctx = Context::new();
    cc.put(&ctx, &RawRecord::new("id", "u:1").with_payload("one"))
        .await
        .unwrap();

    let mut target = RawRecord::new("id", "u:1");
    cc.get(&ctx, &mut target).await.unwrap();
    assert_eq!(target.payload(), "one");
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let mut config = Config::default();
    config.consistency.negative_ttl_secs = config.consistency.positive_ttl_secs + 1;
    let err = CacheManager::build("bad", &config).await.unwrap_err();
    assert!(matches!(err, CacheError::ConfigError(_)));
}
