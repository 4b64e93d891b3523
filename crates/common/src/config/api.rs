//! REST 接口配置

use serde::{Deserialize, Serialize};

fn default_route_prefix() -> String {
    "/json".to_string()
}

fn default_token_header() -> String {
    "iPlanetDirectoryPro".to_string()
}

/// REST 接口配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    /// 路由前缀，realm 资源挂载在 `{route_prefix}/realms` 之下
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,

    /// 携带调用方会话令牌的请求头（同名 Cookie 也会被读取）
    #[serde(default = "default_token_header")]
    pub token_header: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            route_prefix: default_route_prefix(),
            token_header: default_token_header(),
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.route_prefix.starts_with('/') {
            return Err(format!(
                "api.route_prefix '{}' must start with '/'",
                self.route_prefix
            ));
        }
        if self.route_prefix.len() > 1 && self.route_prefix.ends_with('/') {
            return Err(format!(
                "api.route_prefix '{}' must not end with '/'",
                self.route_prefix
            ));
        }
        if self.token_header.trim().is_empty() {
            return Err("api.token_header cannot be empty".to_string());
        }
        Ok(())
    }
}
