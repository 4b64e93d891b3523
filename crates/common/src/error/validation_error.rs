//! 验证相关错误类型

use thiserror::Error;

/// 验证相关错误
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {field}")]
    InvalidInput { field: String },

    #[error("Required field missing: {field}")]
    Required { field: String },

    /// 配置校验的全部错误（不含警告）
    #[error("Configuration validation failed: {}", .errors.join("; "))]
    Config { errors: Vec<String> },
}
