//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了回源合并机制：同一进程内同一 key 的并发回源只执行一次。

use crate::context::Context;
use crate::error::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

/// 回源合并器
#[derive(Default)]
pub struct SingleFlight {
    /// 正在处理的回源任务
    in_flight: DashMap<String, watch::Receiver<()>>,
}

/// 加入回源的身份
pub enum Flight<'a> {
    /// 负责回源，守卫释放时唤醒所有等待者
    Leader(FlightGuard<'a>),
    /// 等待领导者完成
    Follower(watch::Receiver<()>),
}

/// 领导者守卫
///
/// 无论回源成功、失败还是被取消，释放时都会移除登记并唤醒等待者。
pub struct FlightGuard<'a> {
    owner: &'a SingleFlight,
    key: String,
    _done: watch::Sender<()>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // 先移除登记，`_done` 随后被释放，等待者的 changed() 随之返回
        self.owner.in_flight.remove(&self.key);
        debug!("SingleFlight finished: key={}", self.key);
    }
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一次回源
    pub fn begin(&self, key: &str) -> Flight<'_> {
        match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(e) => Flight::Follower(e.get().clone()),
            Entry::Vacant(e) => {
                let (tx, rx) = watch::channel(());
                e.insert(rx);
                Flight::Leader(FlightGuard {
                    owner: self,
                    key: key.to_string(),
                    _done: tx,
                })
            }
        }
    }

    /// 等待领导者完成，受上下文约束
    pub async fn wait(ctx: &Context, mut rx: watch::Receiver<()>) -> Result<()> {
        ctx.run(async move {
            // 发送端只会被释放，不会发送值
            let _ = rx.changed().await;
            Ok(())
        })
        .await
    }

    /// 正在进行的回源数量
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}
