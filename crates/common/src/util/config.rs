//! TLS 配置实现
//!
//! 提供 TLS 服务器配置和加密提供者管理功能

use anyhow::{Context, Result};
use rustls::ServerConfig;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::fs;
use std::io::BufReader;

/// TLS configuration utilities
pub struct TlsConfigurer;

impl TlsConfigurer {
    /// 从 PEM 证书与私钥创建 TLS 服务器配置
    pub fn create_tls_config(cert_path: &str, key_path: &str) -> Result<ServerConfig> {
        let cert_file = fs::File::open(cert_path)
            .with_context(|| format!("Failed to open certificate {cert_path}"))?;
        let key_file = fs::File::open(key_path)
            .with_context(|| format!("Failed to open private key {key_path}"))?;

        let mut cert_reader = BufReader::new(cert_file);
        let mut key_reader = BufReader::new(key_file);

        let cert_chain: Vec<CertificateDer> =
            rustls_pemfile::certs(&mut cert_reader).collect::<Result<Vec<_>, _>>()?;
        if cert_chain.is_empty() {
            anyhow::bail!("No certificate found in {cert_path}");
        }

        let private_key: PrivateKeyDer = rustls_pemfile::private_key(&mut key_reader)?
            .ok_or_else(|| anyhow::anyhow!("No private key found in {key_path}"))?;

        let mut config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(cert_chain, private_key)?;
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        Ok(config)
    }

    /// 安装加密提供程序
    pub fn install_crypto_provider() {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    }
}
