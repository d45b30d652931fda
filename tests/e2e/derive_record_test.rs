//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 端到端派生宏测试

#[path = "../common/mod.rs"]
mod common;

use common::memory_coordinator;
use consistent_cache::{CacheError, ConsistencyPolicy, Context, Named, Record};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default, Record)]
#[record(key = "id", column = "user_id", table = "users")]
struct User {
    id: u64,
    name: String,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default, Record)]
#[record(key = "sku")]
struct Item {
    sku: String,
    price: u32,
}

#[test]
fn test_derived_contract() {
    let user = User {
        id: 42,
        name: "alice".to_string(),
    };
    assert_eq!(user.key_column(), "user_id");
    assert_eq!(user.key(), "42");
    assert_eq!(user.as_named().map(|n| n.name()), Some("users"));
    assert_eq!(Named::name(&user), "users");

    let body = user.write().unwrap();
    let mut decoded = User::default();
    decoded.read(&body).unwrap();
    assert_eq!(decoded, user);

    let item = Item {
        sku: "a-1".to_string(),
        price: 3,
    };
    assert_eq!(item.key_column(), "sku");
    assert!(item.as_named().is_none());
}

#[test]
fn test_derived_read_rejects_garbage() {
    let mut user = User::default();
    let err = user.read("not json").unwrap_err();
    assert!(matches!(err, CacheError::Serialization(_)));
}

#[tokio::test]
async fn test_derived_records_through_coordinator() {
    let (cc, _cache, rows) = memory_coordinator(ConsistencyPolicy::default());
    let ctx = Context::new();

    let user = User {
        id: 7,
        name: "bob".to_string(),
    };
    cc.put(&ctx, &user).await.unwrap();
    assert_eq!(rows.row_count("users"), 1);

    let mut loaded = User {
        id: 7,
        ..User::default()
    };
    cc.get(&ctx, &mut loaded).await.unwrap();
    assert_eq!(loaded, user);

    // 缓存命中同样还原出完整记录
    let mut cached = User {
        id: 7,
        ..User::default()
    };
    cc.get(&ctx, &mut cached).await.unwrap();
    assert_eq!(cached, user);

    let mut missing = Item {
        sku: "none".to_string(),
        price: 0,
    };
    assert!(cc.get(&ctx, &mut missing).await.unwrap_err().is_data_not_exist());
    assert_eq!(rows.row_count("records"), 0);
}
