//! realmd 基础设施库
//!
//! 为 realm 资源服务提供配置、错误分类、指标与 TLS 等基础组件

pub mod config;
pub mod error;
pub mod metrics;
pub mod util;

pub use config::RealmdConfig;
pub use error::{BaseError, ConfigError, Result, SerializationError, ValidationError};
pub use util::TlsConfigurer;
