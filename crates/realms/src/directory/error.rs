//! 组织目录错误
//!
//! 目录调用失败时携带的错误码。错误码的字符串形式与平台 SMS 错误码保持一致，
//! 比较时不区分大小写。

use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};
use thiserror::Error;

/// 目录错误码
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum DirectoryErrorCode {
    #[strum(serialize = "sms-REALM_NAME_NOT_FOUND")]
    RealmNotFound,
    #[strum(serialize = "sms-INVALID_SSO_TOKEN")]
    InvalidToken,
    #[strum(serialize = "sms-organization_already_exists1")]
    OrganizationExists,
    #[strum(serialize = "sms-invalid-org-name")]
    InvalidOrganizationName,
    #[strum(serialize = "sms-cannot_delete_rootsuffix")]
    CannotDeleteRootSuffix,
    #[strum(serialize = "sms-entries-exists")]
    EntriesExist,
    #[strum(serialize = "sms-SMSSchema_service_notfound")]
    ServiceNotFound,
    #[strum(serialize = "sms-no-organization-schema")]
    NoOrganizationSchema,
    #[strum(serialize = "sms-attribute-values-does-not-match-schema")]
    AttributeValuesMismatch,
    /// 未收录的错误码，保留原始字符串
    #[strum(default)]
    Other(String),
}

impl DirectoryErrorCode {
    /// 解析平台错误码（不区分大小写）
    pub fn parse(code: &str) -> Self {
        Self::from_str(code.trim()).unwrap_or_else(|_| Self::Other(code.to_string()))
    }
}

/// 目录调用错误
#[derive(Debug, Clone, Error)]
#[error("{message} [{code}]")]
pub struct DirectoryError {
    pub code: DirectoryErrorCode,
    pub message: String,
}

impl DirectoryError {
    pub fn new(code: DirectoryErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// 由平台错误码字符串构造
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        Self::new(DirectoryErrorCode::parse(code), message)
    }

    pub fn realm_not_found(realm: impl fmt::Display) -> Self {
        Self::new(
            DirectoryErrorCode::RealmNotFound,
            format!("Realm {realm} not found"),
        )
    }

    pub fn is_realm_not_found(&self) -> bool {
        self.code == DirectoryErrorCode::RealmNotFound
    }
}

/// 目录结果类型别名
pub type DirectoryResult<T> = Result<T, DirectoryError>;
