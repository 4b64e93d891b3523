//! 监听配置：`[bind.http]` 与 `[bind.https]` 至少配置一个

pub mod http;
pub mod https;

pub use crate::config::bind::http::HttpBindConfig;
pub use crate::config::bind::https::HttpsBindConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BindConfig {
    /// 明文监听，仅 dev 环境启用
    pub http: Option<HttpBindConfig>,

    /// TLS 监听，非 dev 环境必需
    pub https: Option<HttpsBindConfig>,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            http: Some(HttpBindConfig::default()),
            https: Some(HttpsBindConfig::default()),
        }
    }
}

impl BindConfig {
    /// 仅 HTTP 的绑定（测试与本地开发）
    pub fn http_only(ip: &str, port: u16) -> Self {
        Self {
            http: Some(HttpBindConfig {
                ip: ip.to_string(),
                port,
                ..HttpBindConfig::default()
            }),
            https: None,
        }
    }

    /// 返回全部错误与警告
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.http.is_none() && self.https.is_none() {
            errors.push("At least one of bind.http or bind.https must be configured".to_string());
        }
        if let Some(ref http) = self.http
            && let Err(e) = http.validate()
        {
            errors.push(e);
        }
        if let Some(ref https) = self.https {
            match https.validate() {
                Ok(warnings) => errors.extend(warnings),
                Err(e) => errors.push(e),
            }
        }

        errors
    }
}
