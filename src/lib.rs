//! consistent_cache - 缓存与数据库一致性协调库
//!
//! 在易失性缓存与权威数据库之间编排读写流程，支持按 key 禁用缓存回填、
//! 空值缓存以及基于冲突回退的 upsert。

#![doc(html_root_url = "https://docs.rs/consistent_cache/0.1.0")]

extern crate self as consistent_cache;

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod record;
pub mod serialization;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod utils;

pub use cache::{CacheStore, MemoryCache, RedisCache};
pub use config::Config;
pub use consistent_cache_macros::Record;
pub use context::Context;
pub use coordinator::{ConsistencyPolicy, ConsistentCache};
pub use error::{CacheError, Result};
pub use manager::{get_client, CacheManager};
pub use record::{Named, RawRecord, Record};
pub use store::{MemoryRows, PersistentStore, RecordStore, SeaOrmRows};

/// 空值哨兵，表示数据库中确认不存在该记录
///
/// 它不是合法的JSON，任何 `JsonCodec` 负载都不会与之相同。
pub const NULL_DATA: &str = "Err_Syntax_Null_Data";

/// consistent_cache 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
