//! Prometheus 监控指标模块
//!
//! 提供全局指标收集和导出功能

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Once;
use std::time::Instant;

static METRICS_INIT: Once = Once::new();

lazy_static! {
    /// 全局 Prometheus Registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ========== 性能指标 ==========

    /// HTTP 请求延迟（秒）
    pub static ref REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("request_duration_seconds", "HTTP request duration in seconds")
            .namespace("realmd")
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["service", "method", "path", "status"]
    ).unwrap();

    /// HTTP 请求总数
    pub static ref REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("requests_total", "Total number of HTTP requests")
            .namespace("realmd"),
        &["service", "method", "path", "status"]
    ).unwrap();

    // ========== 安全指标 ==========

    /// 认证失败次数
    pub static ref AUTH_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("auth_failures_total", "Total number of authentication failures")
            .namespace("realmd"),
        &["service", "reason"]
    ).unwrap();

    /// 非法请求次数（请求体无法解析等）
    pub static ref INVALID_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("invalid_requests_total", "Total number of invalid requests")
            .namespace("realmd"),
        &["service", "reason"]
    ).unwrap();

    // ========== 系统指标 ==========

    /// 进程启动时间（Unix 秒）
    pub static ref START_TIME_SECONDS: IntGauge = IntGauge::new(
        "realmd_start_time_seconds",
        "Start time of the process since unix epoch in seconds"
    ).unwrap();
}

/// 注册所有指标到全局 Registry
///
/// This function is idempotent - calling it multiple times is safe.
/// Only the first call will actually register the metrics.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    let mut result = Ok(());

    METRICS_INIT.call_once(|| {
        let register_result = (|| {
            REGISTRY.register(Box::new(REQUEST_DURATION.clone()))?;
            REGISTRY.register(Box::new(REQUESTS_TOTAL.clone()))?;
            REGISTRY.register(Box::new(AUTH_FAILURES.clone()))?;
            REGISTRY.register(Box::new(INVALID_REQUESTS.clone()))?;
            REGISTRY.register(Box::new(START_TIME_SECONDS.clone()))?;
            Ok::<(), prometheus::Error>(())
        })();

        if let Err(e) = register_result {
            result = Err(e);
        }
    });

    result
}

/// 记录进程启动时间
pub fn mark_started() {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();
    START_TIME_SECONDS.set(now);
}

/// HTTP 请求计时器
pub struct RequestTimer {
    start: Instant,
    service: String,
    method: String,
    path: String,
}

impl RequestTimer {
    /// 创建计时器
    pub fn new(service: &str, method: &str, path: &str) -> Self {
        Self {
            start: Instant::now(),
            service: service.to_string(),
            method: method.to_string(),
            path: path.to_string(),
        }
    }

    /// 完成计时并记录指标
    pub fn observe(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();
        let status_str = status.to_string();

        REQUEST_DURATION
            .with_label_values(&[&self.service, &self.method, &self.path, &status_str])
            .observe(duration);

        REQUESTS_TOTAL
            .with_label_values(&[&self.service, &self.method, &self.path, &status_str])
            .inc();
    }
}

/// 导出 Prometheus 格式的指标
pub fn export_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }

    String::from_utf8(buffer).unwrap_or_default()
}
