//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 统一工具模块
//!
//! 提供日志脱敏与Redis可用性检查等工具函数。

pub mod redaction;

use std::time::Duration;

/// 检查指定URL的Redis是否可用
///
/// 设置了 `CONSISTENT_CACHE_SKIP_REDIS_TESTS` 时直接返回false
pub async fn is_redis_available_url(url: &str) -> bool {
    if std::env::var("CONSISTENT_CACHE_SKIP_REDIS_TESTS").is_ok() {
        return false;
    }
    let client = match redis::Client::open(url) {
        Ok(c) => c,
        Err(_) => return false,
    };

    matches!(
        tokio::time::timeout(
            Duration::from_secs(1),
            client.get_multiplexed_async_connection(),
        )
        .await,
        Ok(Ok(_))
    )
}
