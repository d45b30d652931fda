//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了启用、禁用与失效命令的实现。

use crate::cli::{raw_record, DisableArgs, EnableArgs, RecordArgs};
use crate::config::Config;
use crate::context::Context;
use crate::coordinator::ConsistentCache;
use anyhow::{Context as _, Result};

pub async fn invalidate(
    cc: &ConsistentCache,
    ctx: &Context,
    config: &Config,
    args: &RecordArgs,
) -> Result<()> {
    let record = raw_record(config, args);
    cc.invalidate(ctx, &record)
        .await
        .with_context(|| format!("Failed to invalidate key '{}'", args.key))?;
    println!("Invalidated {}", cc.cache_key(&record));
    Ok(())
}

pub async fn disable(
    cc: &ConsistentCache,
    ctx: &Context,
    config: &Config,
    args: &DisableArgs,
) -> Result<()> {
    let record = raw_record(config, &args.record);
    let expire = args.expire.unwrap_or(cc.policy().disable_expire_secs);
    cc.disable_for(ctx, &record, expire)
        .await
        .with_context(|| format!("Failed to disable key '{}'", args.record.key))?;
    println!("Disabled {} for {}s", cc.cache_key(&record), expire);
    Ok(())
}

pub async fn enable(
    cc: &ConsistentCache,
    ctx: &Context,
    config: &Config,
    args: &EnableArgs,
) -> Result<()> {
    let record = raw_record(config, &args.record);
    let delay = args.delay.unwrap_or(cc.policy().enable_delay_ms);
    cc.enable_with_delay(ctx, &record, delay)
        .await
        .with_context(|| format!("Failed to enable key '{}'", args.record.key))?;
    println!("Enabled {} after {}ms", cc.cache_key(&record), delay);
    Ok(())
}
