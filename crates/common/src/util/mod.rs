//! TLS 配置模块
//!
//! 提供 TLS 相关配置和加密提供者管理功能

pub mod config;

pub use config::TlsConfigurer;
