//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于sea-orm的行级存储实现，支持SQLite、PostgreSQL和MySQL。

use super::{validate_identifier, InsertOutcome, RowBackend, PAYLOAD_COLUMN};
use crate::config::StoreConfig;
use crate::context::Context;
use crate::error::{CacheError, Result};
use crate::utils::redaction::redact_connection_string;
use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
    SqlErr, Statement, Value,
};
use secrecy::ExposeSecret;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// sea-orm行级存储
#[derive(Clone)]
pub struct SeaOrmRows {
    conn: DatabaseConnection,
}

impl std::fmt::Debug for SeaOrmRows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeaOrmRows")
            .field("backend", &self.conn.get_database_backend())
            .finish()
    }
}

/// 确保SQLite文件所在目录存在，并允许自动创建数据库文件
fn prepare_sqlite(connection_string: &str) -> Result<String> {
    let Some(rest) = connection_string.strip_prefix("sqlite:") else {
        return Ok(connection_string.to_string());
    };
    let path = rest.trim_start_matches("//");
    if path.starts_with(":memory:") {
        return Ok(connection_string.to_string());
    }

    let file = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(file).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::Store(format!(
                    "无法创建数据库目录 {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    if path.contains("mode=") {
        Ok(connection_string.to_string())
    } else if path.contains('?') {
        Ok(format!("{}&mode=rwc", connection_string))
    } else {
        Ok(format!("{}?mode=rwc", connection_string))
    }
}

/// 判断错误是否为唯一约束冲突
fn is_unique_violation(err: &DbErr) -> bool {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }
    let message = err.to_string();
    message.contains("UNIQUE constraint failed")
        || message.contains("Duplicate entry")
        || message.contains("duplicate key value")
}

impl SeaOrmRows {
    /// 根据配置建立数据库连接
    #[instrument(skip(config), level = "info", name = "init_sql_store")]
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let raw = config.connection_string.expose_secret();
        let connection_string = prepare_sqlite(raw)?;
        let in_memory = connection_string.contains(":memory:");

        let mut opt = ConnectOptions::new(connection_string.clone());
        // 每个SQLite内存连接都是独立的数据库
        let max_connections = if in_memory { 1 } else { config.max_connections };
        opt.max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await.map_err(|e| {
            CacheError::Store(format!(
                "Failed to open database {}: {}",
                redact_connection_string(&connection_string),
                e
            ))
        })?;
        info!(
            "Connected to {:?} store: {}",
            conn.get_database_backend(),
            redact_connection_string(&connection_string)
        );
        Ok(Self { conn })
    }

    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    fn backend(&self) -> DatabaseBackend {
        self.conn.get_database_backend()
    }

    fn quote(&self, identifier: &str) -> String {
        match self.backend() {
            DatabaseBackend::MySql => format!("`{}`", identifier),
            _ => format!("\"{}\"", identifier),
        }
    }

    /// 第 `n` 个参数占位符（从1开始）
    fn placeholder(&self, n: usize) -> String {
        match self.backend() {
            DatabaseBackend::Postgres => format!("${}", n),
            _ => "?".to_string(),
        }
    }

    fn statement(&self, sql: String, values: Vec<Value>) -> Statement {
        Statement::from_sql_and_values(self.backend(), sql, values)
    }

    /// 创建记录表（若不存在）
    #[instrument(skip(self), level = "debug")]
    pub async fn ensure_table(&self, table: &str, key_column: &str) -> Result<()> {
        validate_identifier(table)?;
        validate_identifier(key_column)?;
        let (key_type, payload_type) = match self.backend() {
            DatabaseBackend::MySql => ("VARCHAR(255)", "LONGTEXT"),
            _ => ("TEXT", "TEXT"),
        };
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({} {} PRIMARY KEY NOT NULL, {} {} NOT NULL)",
            self.quote(table),
            self.quote(key_column),
            key_type,
            self.quote(PAYLOAD_COLUMN),
            payload_type
        );
        debug!("Creating table with SQL: {}", sql);
        self.conn
            .execute(Statement::from_string(self.backend(), sql))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RowBackend for SeaOrmRows {
    async fn insert(
        &self,
        ctx: &Context,
        table: &str,
        key_column: &str,
        key: &str,
        payload: &str,
    ) -> Result<InsertOutcome> {
        ctx.check()?;
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES ({}, {})",
            self.quote(table),
            self.quote(key_column),
            self.quote(PAYLOAD_COLUMN),
            self.placeholder(1),
            self.placeholder(2)
        );
        let stmt = self.statement(sql, vec![key.into(), payload.into()]);
        match self.conn.execute(stmt).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::DuplicateKey),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(
        &self,
        ctx: &Context,
        table: &str,
        key_column: &str,
        key: &str,
        payload: &str,
    ) -> Result<u64> {
        ctx.check()?;
        let sql = format!(
            "UPDATE {} SET {} = {} WHERE {} = {}",
            self.quote(table),
            self.quote(PAYLOAD_COLUMN),
            self.placeholder(1),
            self.quote(key_column),
            self.placeholder(2)
        );
        let stmt = self.statement(sql, vec![payload.into(), key.into()]);
        let result = self.conn.execute(stmt).await?;
        Ok(result.rows_affected())
    }

    async fn select(
        &self,
        ctx: &Context,
        table: &str,
        key_column: &str,
        key: &str,
    ) -> Result<Option<String>> {
        ctx.check()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            self.quote(PAYLOAD_COLUMN),
            self.quote(table),
            self.quote(key_column),
            self.placeholder(1)
        );
        let stmt = self.statement(sql, vec![key.into()]);
        match self.conn.query_one(stmt).await? {
            Some(row) => Ok(Some(row.try_get::<String>("", PAYLOAD_COLUMN)?)),
            None => Ok(None),
        }
    }

    async fn delete(
        &self,
        ctx: &Context,
        table: &str,
        key_column: &str,
        key: &str,
    ) -> Result<u64> {
        ctx.check()?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            self.quote(table),
            self.quote(key_column),
            self.placeholder(1)
        );
        let stmt = self.statement(sql, vec![key.into()]);
        let result = self.conn.execute(stmt).await?;
        Ok(result.rows_affected())
    }
}
