use super::http::validate_listener;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// HTTPS 监听配置（rustls，PEM 证书）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpsBindConfig {
    /// 对外域名，需与证书匹配
    pub domain_name: String,

    #[serde(default = "default_advertised_ip")]
    pub advertised_ip: String,

    pub ip: String,

    pub port: u16,

    /// PEM 证书链路径
    pub cert: String,

    /// PEM 私钥路径（PKCS#8 / RSA / SEC1）
    pub key: String,
}

fn default_advertised_ip() -> String {
    "127.0.0.1".to_string()
}

impl Default for HttpsBindConfig {
    fn default() -> Self {
        Self {
            domain_name: "localhost".to_string(),
            advertised_ip: default_advertised_ip(),
            ip: "0.0.0.0".to_string(),
            port: 8443,
            cert: "certificates/server.crt".to_string(),
            key: "certificates/server.key".to_string(),
        }
    }
}

impl HttpsBindConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// 校验监听配置；证书文件缺失只作为警告返回
    pub fn validate(&self) -> Result<Vec<String>, String> {
        validate_listener("bind.https", &self.ip, &self.domain_name)?;
        if self.cert.trim().is_empty() || self.key.trim().is_empty() {
            return Err("bind.https.cert and bind.https.key must both be set".to_string());
        }

        let warnings = [("cert", &self.cert), ("key", &self.key)]
            .into_iter()
            .filter(|(_, path)| !Path::new(path.as_str()).is_file())
            .map(|(field, path)| format!("Warning: bind.https.{field} file '{path}' does not exist"))
            .collect();
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_certificate_files_are_warnings() {
        let config = HttpsBindConfig {
            cert: "/definitely/missing.crt".to_string(),
            key: "/definitely/missing.key".to_string(),
            ..HttpsBindConfig::default()
        };
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.starts_with("Warning:")));
    }

    #[test]
    fn test_empty_key_is_error() {
        let config = HttpsBindConfig {
            key: String::new(),
            ..HttpsBindConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
