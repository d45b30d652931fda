//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了一致性缓存的指标收集和监控功能。

use dashmap::DashMap;
use lazy_static::lazy_static;
use std::fmt::Write;
use std::sync::Arc;

/// 请求计数的标签：(service, op, result)
pub type RequestLabels = (String, String, String);

/// 耗时统计的标签：(service, op)
pub type DurationLabels = (String, String);

/// 指标收集器
///
/// 用于收集和存储读写流程的运行时指标。标签按元组分别保存，
/// 名称中出现任意字符都不会影响输出。
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    /// 请求总数统计
    pub requests_total: Arc<DashMap<RequestLabels, u64>>,
    /// 操作耗时（累积时间和计数）
    pub operation_duration: Arc<DashMap<DurationLabels, (f64, u64)>>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

fn request_labels(service: &str, op: &str, result: &str) -> RequestLabels {
    (service.to_string(), op.to_string(), result.to_string())
}

impl Metrics {
    /// 记录请求指标
    ///
    /// # 参数
    ///
    /// * `service` - 协调器名称
    /// * `op` - 操作类型（get/put/populate/invalidate）
    /// * `result` - 操作结果（hit/negative_hit/miss/ok/error 等）
    pub fn record_request(&self, service: &str, op: &str, result: &str) {
        *self
            .requests_total
            .entry(request_labels(service, op, result))
            .or_insert(0) += 1;
    }

    /// 记录操作耗时
    pub fn record_duration(&self, service: &str, op: &str, duration_secs: f64) {
        let mut entry = self
            .operation_duration
            .entry((service.to_string(), op.to_string()))
            .or_insert((0.0, 0));
        entry.0 += duration_secs;
        entry.1 += 1;
    }

    /// 读取某个请求计数
    pub fn request_count(&self, service: &str, op: &str, result: &str) -> u64 {
        self.requests_total
            .get(&request_labels(service, op, result))
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// 清空所有指标
    pub fn reset(&self) {
        self.requests_total.clear();
        self.operation_duration.clear();
    }
}

/// 获取指标字符串
///
/// 将所有指标格式化为文本返回，用于监控系统采集
pub fn get_metrics_string() -> String {
    render(&GLOBAL_METRICS)
}

/// 转义标签值中的反斜杠、双引号与换行
fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn render(metrics: &Metrics) -> String {
    let mut reqs: Vec<(RequestLabels, u64)> = metrics
        .requests_total
        .iter()
        .map(|e| (e.key().clone(), *e.value()))
        .collect();
    reqs.sort();
    let mut dur: Vec<(DurationLabels, (f64, u64))> = metrics
        .operation_duration
        .iter()
        .map(|e| (e.key().clone(), *e.value()))
        .collect();
    dur.sort_by(|a, b| a.0.cmp(&b.0));

    let mut output = String::new();
    for ((service, op, result), v) in reqs {
        let _ = writeln!(
            output,
            "consistent_cache_requests_total{{service=\"{}\", op=\"{}\", result=\"{}\"}} {}",
            escape_label(&service),
            escape_label(&op),
            escape_label(&result),
            v
        );
    }
    for ((service, op), (total, count)) in dur {
        let service = escape_label(&service);
        let op = escape_label(&op);
        let _ = writeln!(
            output,
            "consistent_cache_operation_duration_seconds_sum{{service=\"{}\", op=\"{}\"}} {}",
            service, op, total
        );
        let _ = writeln!(
            output,
            "consistent_cache_operation_duration_seconds_count{{service=\"{}\", op=\"{}\"}} {}",
            service, op, count
        );
    }
    output
}
