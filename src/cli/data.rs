//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了读写命令的实现。

use crate::cli::{raw_record, GetArgs, PutArgs};
use crate::config::Config;
use crate::context::Context;
use crate::coordinator::ConsistentCache;
use anyhow::{Context as _, Result};

pub async fn get(cc: &ConsistentCache, ctx: &Context, config: &Config, args: &GetArgs) -> Result<()> {
    let mut record = raw_record(config, &args.record);
    match cc.get(ctx, &mut record).await {
        Ok(()) => {
            println!("{}", record.payload());
            Ok(())
        }
        Err(e) if e.is_data_not_exist() => {
            println!("(not found) {}", args.record.key);
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read key '{}'", args.record.key)),
    }
}

pub async fn put(cc: &ConsistentCache, ctx: &Context, config: &Config, args: &PutArgs) -> Result<()> {
    let record = raw_record(config, &args.record).with_payload(args.payload.clone());
    let result = if args.fenced {
        cc.put_fenced(ctx, &record).await
    } else {
        cc.put(ctx, &record).await
    };
    result.with_context(|| format!("Failed to write key '{}'", args.record.key))?;
    println!("OK");
    Ok(())
}
