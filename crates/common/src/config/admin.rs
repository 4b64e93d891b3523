//! 管理员凭证配置

use serde::{Deserialize, Serialize};

/// 建议的最短令牌长度
const MIN_TOKEN_LEN: usize = 16;

/// 管理员凭证配置
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AdminConfig {
    /// 访问组织目录使用的管理员令牌
    pub admin_token: String,

    /// 允许管理 realm 的超级管理员会话令牌
    ///
    /// 调用方携带的令牌与其中任一项匹配即拥有权限。为空时所有请求返回 401。
    #[serde(default)]
    pub super_admin_tokens: Vec<String>,
}

impl AdminConfig {
    /// 校验管理员配置，返回错误与警告（警告以 "Warning:" 开头）
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.admin_token.trim().is_empty() {
            errors.push("admin.admin_token cannot be empty".to_string());
        } else if self.admin_token.len() < MIN_TOKEN_LEN {
            errors.push(format!(
                "Warning: admin.admin_token is too short, recommend at least {MIN_TOKEN_LEN} characters"
            ));
        }

        if self.super_admin_tokens.is_empty() {
            errors.push(
                "Warning: admin.super_admin_tokens is empty, every realm request will be rejected"
                    .to_string(),
            );
        }

        if self.super_admin_tokens.iter().any(|t| t.trim().is_empty()) {
            errors.push("admin.super_admin_tokens cannot contain empty tokens".to_string());
        }

        errors
    }
}
