use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// 明文 HTTP 监听配置（开发与内网环境）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpBindConfig {
    /// 对外域名，用于拼接服务地址
    pub domain_name: String,

    /// 对外宣告的 IP
    #[serde(default = "default_advertised_ip")]
    pub advertised_ip: String,

    /// 监听 IP，"0.0.0.0" 表示所有接口
    pub ip: String,

    /// 监听端口，0 表示由系统分配
    pub port: u16,
}

fn default_advertised_ip() -> String {
    "127.0.0.1".to_string()
}

impl Default for HttpBindConfig {
    fn default() -> Self {
        Self {
            domain_name: "localhost".to_string(),
            advertised_ip: default_advertised_ip(),
            ip: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl HttpBindConfig {
    /// `ip:port` 形式的监听地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_listener("bind.http", &self.ip, &self.domain_name)
    }
}

/// 监听 IP 与域名的公共校验
pub(crate) fn validate_listener(section: &str, ip: &str, domain_name: &str) -> Result<(), String> {
    if ip.parse::<IpAddr>().is_err() {
        return Err(format!("{section}.ip '{ip}' is not a valid IP address"));
    }
    if domain_name.trim().is_empty() {
        return Err(format!("{section}.domain_name cannot be empty"));
    }
    Ok(())
}
