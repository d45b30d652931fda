//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了请求上下文，负责在边界调用间传递取消信号与截止时间。

use crate::error::{CacheError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 请求上下文
///
/// 由调用方按请求创建，贯穿协调器与缓存、数据库的每一次边界调用。
/// 克隆得到的上下文共享同一个取消令牌。
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// 创建没有截止时间的上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建在 `timeout` 后过期的上下文
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// 从已有的取消令牌创建上下文
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// 派生子上下文
    ///
    /// 父上下文取消时子上下文随之取消，反之不然。截止时间取两者中较早者。
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let deadline = match (self.deadline, timeout.map(|t| Instant::now() + t)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    /// 取消上下文
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 上下文是否已被取消或超过截止时间
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// 检查上下文状态，已结束时返回对应错误
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(CacheError::Canceled("context canceled".to_string()));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(CacheError::Timeout("context deadline exceeded".to_string()));
        }
        Ok(())
    }

    /// 在上下文约束下执行边界调用
    ///
    /// 取消优先于截止时间，截止时间优先于调用结果。
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(CacheError::Canceled("context canceled".to_string())),
            _ = expired => Err(CacheError::Timeout("context deadline exceeded".to_string())),
            res = fut => res,
        }
    }
}
