//! 调用方鉴权与管理员凭证
//!
//! - [`AuthorizationCheck`]: 判断调用方是否拥有 realm 管理权限
//! - [`AdminCredentialProvider`]: 提供访问组织目录所需的管理员令牌

use crate::request::RequestContext;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

/// 管理员令牌
///
/// Debug 输出不包含令牌内容。
#[derive(Clone, PartialEq, Eq)]
pub struct AdminToken(String);

impl AdminToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AdminToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminToken(***)")
    }
}

/// 权限检查
pub trait AuthorizationCheck: Send + Sync {
    fn has_permission(&self, context: &RequestContext) -> bool;
}

impl<F> AuthorizationCheck for F
where
    F: Fn(&RequestContext) -> bool + Send + Sync,
{
    fn has_permission(&self, context: &RequestContext) -> bool {
        self(context)
    }
}

/// 管理员凭证提供者
pub trait AdminCredentialProvider: Send + Sync {
    fn admin_token(&self) -> AdminToken;
}

/// 固定管理员令牌（来自配置）
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    token: AdminToken,
}

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AdminToken::new(token),
        }
    }
}

impl AdminCredentialProvider for StaticCredentialProvider {
    fn admin_token(&self) -> AdminToken {
        self.token.clone()
    }
}

/// 超级管理员令牌校验
///
/// 仅保存令牌的 SHA-256 摘要，调用方令牌摘要命中即视为有权限。
#[derive(Debug, Clone, Default)]
pub struct AdminTokenAuthorizer {
    digests: HashSet<String>,
}

impl AdminTokenAuthorizer {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            digests: tokens
                .into_iter()
                .map(|token| token_digest(token.as_ref()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

impl AuthorizationCheck for AdminTokenAuthorizer {
    fn has_permission(&self, context: &RequestContext) -> bool {
        match context.token() {
            Some(token) => self.digests.contains(&token_digest(token)),
            None => false,
        }
    }
}

/// 令牌的 SHA-256 十六进制摘要
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_token_debug_is_redacted() {
        let token = AdminToken::new("super-secret");
        assert_eq!(format!("{token:?}"), "AdminToken(***)");
        assert_eq!(token.expose_secret(), "super-secret");
    }

    #[test]
    fn test_authorizer_matches_configured_tokens() {
        let authorizer = AdminTokenAuthorizer::new(["amadmin-token", "ops-token"]);
        assert_eq!(authorizer.len(), 2);

        assert!(authorizer.has_permission(&RequestContext::with_token("amadmin-token")));
        assert!(authorizer.has_permission(&RequestContext::with_token("ops-token")));
        assert!(!authorizer.has_permission(&RequestContext::with_token("user-token")));
        assert!(!authorizer.has_permission(&RequestContext::anonymous()));
    }

    #[test]
    fn test_empty_authorizer_denies_everyone() {
        let authorizer = AdminTokenAuthorizer::default();
        assert!(authorizer.is_empty());
        assert!(!authorizer.has_permission(&RequestContext::with_token("")));
    }

    #[test]
    fn test_closure_check() {
        let allow_all = |_: &RequestContext| true;
        assert!(allow_all.has_permission(&RequestContext::anonymous()));
    }

    #[test]
    fn test_token_digest() {
        assert_eq!(
            token_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_static_provider() {
        let provider = StaticCredentialProvider::new("admin");
        assert_eq!(provider.admin_token(), AdminToken::new("admin"));
    }
}
