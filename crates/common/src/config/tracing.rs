//! `[observability.tracing]` OTLP 导出配置
//!
//! 仅在编译启用 `opentelemetry` feature 时生效。

use serde::{Deserialize, Serialize};

const DEFAULT_SERVICE_NAME: &str = "realmd";
const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:4317";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    /// 是否导出 span，默认关闭
    #[serde(default)]
    pub enable: bool,

    /// 追踪后端中显示的服务名
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// OTLP gRPC 端点（Jaeger / Tempo / Collector）
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enable: false,
            service_name: default_service_name(),
            endpoint: default_endpoint(),
        }
    }
}

impl TracingConfig {
    /// 关闭时不做检查
    pub fn validate(&self) -> Result<(), String> {
        if !self.enable {
            return Ok(());
        }

        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err("observability.tracing.endpoint cannot be empty when enabled".to_string());
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(format!(
                "observability.tracing.endpoint '{endpoint}' must be an http:// or https:// URL"
            ));
        }
        if self.service_name.trim().is_empty() {
            return Err("observability.tracing.service_name cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enable
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.trim()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}
