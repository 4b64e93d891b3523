//! 资源请求类型

use crate::descriptor::RealmDescriptor;
use serde_json::Value;

/// 调用方上下文
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// 带会话令牌的上下文；空令牌视为匿名
    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: (!token.trim().is_empty()).then_some(token),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// 创建请求
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    /// 协议层资源名，如 `/top/realms`
    pub resource_name: String,
    pub content: RealmDescriptor,
}

impl CreateRequest {
    pub fn new(resource_name: impl Into<String>, content: RealmDescriptor) -> Self {
        Self {
            resource_name: resource_name.into(),
            content,
        }
    }
}

/// 更新请求
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub content: RealmDescriptor,
}

impl UpdateRequest {
    pub fn new(content: RealmDescriptor) -> Self {
        Self { content }
    }
}

/// 动作请求
#[derive(Debug, Clone, Default)]
pub struct ActionRequest {
    pub action: String,
    pub content: Value,
}

/// 局部修改请求
#[derive(Debug, Clone, Default)]
pub struct PatchRequest {
    pub operations: Value,
}
