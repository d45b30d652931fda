//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use crate::config::Config;
use crate::coordinator::ConsistentCache;
use crate::manager::CacheManager;
use crate::record::RawRecord;
use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "consistent-cache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Path to the TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Log filter, overrides RUST_LOG")]
    pub log: Option<String>,

    #[arg(long, global = true, default_value_t = 5000, help = "Per-command timeout in milliseconds")]
    pub timeout_ms: u64,

    #[arg(long, global = true, help = "Print the counters collected by the command")]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "get", about = "Read a record through the cache")]
    Get(GetArgs),

    #[command(name = "put", about = "Write a record to the store and invalidate the cache")]
    Put(PutArgs),

    #[command(name = "invalidate", about = "Delete the cached entry of a record")]
    Invalidate(RecordArgs),

    #[command(name = "disable", about = "Stop read-path population for a record")]
    Disable(DisableArgs),

    #[command(name = "enable", about = "Resume read-path population for a record")]
    Enable(EnableArgs),
}

#[derive(Parser, Debug)]
pub struct RecordArgs {
    #[arg(short, long, help = "Record key")]
    pub key: String,

    #[arg(long, help = "Key column, defaults to store.default_key_column")]
    pub column: Option<String>,

    #[arg(long, help = "Table, defaults to store.default_table")]
    pub table: Option<String>,
}

#[derive(Parser, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub record: RecordArgs,
}

#[derive(Parser, Debug)]
pub struct PutArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    #[arg(short, long, help = "Payload to store")]
    pub payload: String,

    #[arg(long, help = "Disable population while writing and re-enable after the configured delay")]
    pub fenced: bool,
}

#[derive(Parser, Debug)]
pub struct DisableArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    #[arg(short, long, help = "Seconds until the marker expires")]
    pub expire: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct EnableArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    #[arg(short, long, help = "Milliseconds before population resumes")]
    pub delay: Option<u64>,
}

mod control;
mod data;

/// 按命令行参数构造记录，未指定的键列取配置中的默认值
fn raw_record(config: &Config, args: &RecordArgs) -> RawRecord {
    let column = args
        .column
        .clone()
        .unwrap_or_else(|| config.store.default_key_column.clone());
    let record = RawRecord::new(column, args.key.clone());
    match &args.table {
        Some(table) => record.with_table(table.clone()),
        None => record,
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(p) => Config::from_file(p)
            .with_context(|| format!("Failed to load configuration from {}", p.display())),
        None => Ok(Config::default()),
    }
}

async fn connect(config: &Config) -> Result<ConsistentCache> {
    CacheManager::build("cli", config)
        .await
        .context("Failed to initialise cache and store")
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::telemetry::init_tracing("consistent-cache", cli.log.as_deref());

    let config = load_config(cli.config.as_ref())?;
    let cc = connect(&config).await?;
    let ctx = crate::context::Context::with_timeout(std::time::Duration::from_millis(cli.timeout_ms));

    let result = match &cli.command {
        Commands::Get(args) => data::get(&cc, &ctx, &config, args).await,
        Commands::Put(args) => data::put(&cc, &ctx, &config, args).await,
        Commands::Invalidate(args) => control::invalidate(&cc, &ctx, &config, args).await,
        Commands::Disable(args) => control::disable(&cc, &ctx, &config, args).await,
        Commands::Enable(args) => control::enable(&cc, &ctx, &config, args).await,
    };

    // 指标只在本进程内收集，命令结束后立即输出
    if cli.metrics {
        print!("{}", crate::metrics::get_metrics_string());
    }
    result
}
