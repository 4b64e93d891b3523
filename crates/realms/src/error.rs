//! Realm 资源错误定义
//!
//! 资源协议层对调用方暴露的封闭错误集合，以及 HTTP 响应映射

use crate::directory::{DirectoryError, DirectoryErrorCode};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use strum::{Display, EnumIter};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 资源错误种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ErrorKind {
    Unauthorized,
    BadRequest,
    NotFound,
    Conflict,
    Forbidden,
    NotSupported,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotSupported => StatusCode::NOT_IMPLEMENTED,
        }
    }

    /// 指标标签
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotSupported => "not_supported",
        }
    }
}

/// 资源操作错误
///
/// 携带错误种类、面向调用方的消息，以及可选的原始错误（用于诊断）。
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct ResourceError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ResourceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// 401，默认消息 "Unauthorized"
    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized, "Unauthorized")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotSupported, message)
    }

    /// 附加原始错误
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }
}

impl IntoResponse for ResourceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self.source {
            Some(source) => tracing::debug!("Realm request failed: {} (cause: {})", self, source),
            None => tracing::debug!("Realm request failed: {}", self),
        }

        let body = Json(json!({
            "code": status.as_u16(),
            "reason": status.canonical_reason().unwrap_or("Error"),
            "message": self.message,
        }));

        (status, body).into_response()
    }
}

/// Realm 资源结果类型别名
pub type ResourceResult<T> = Result<T, ResourceError>;

/// 目录错误码对应的资源错误种类
pub fn directory_error_kind(code: &DirectoryErrorCode) -> ErrorKind {
    match code {
        DirectoryErrorCode::RealmNotFound => ErrorKind::NotFound,
        DirectoryErrorCode::InvalidToken => ErrorKind::Unauthorized,
        DirectoryErrorCode::OrganizationExists => ErrorKind::Conflict,
        DirectoryErrorCode::InvalidOrganizationName => ErrorKind::BadRequest,
        DirectoryErrorCode::CannotDeleteRootSuffix => ErrorKind::Unauthorized,
        DirectoryErrorCode::EntriesExist => ErrorKind::Conflict,
        DirectoryErrorCode::ServiceNotFound => ErrorKind::NotFound,
        DirectoryErrorCode::NoOrganizationSchema => ErrorKind::NotFound,
        DirectoryErrorCode::AttributeValuesMismatch => ErrorKind::BadRequest,
        DirectoryErrorCode::Other(_) => ErrorKind::BadRequest,
    }
}

/// 目录错误转换为资源错误，保留原始错误
pub fn map_directory_error(err: &DirectoryError) -> ResourceError {
    let message = match err.code {
        DirectoryErrorCode::InvalidToken => "Unauthorized-Invalid SSO Token".to_string(),
        DirectoryErrorCode::CannotDeleteRootSuffix => {
            "Unauthorized-Cannot delete root suffix".to_string()
        }
        _ => err.message.clone(),
    };
    ResourceError::new(directory_error_kind(&err.code), message).with_source(err.clone())
}

impl From<DirectoryError> for ResourceError {
    fn from(err: DirectoryError) -> Self {
        map_directory_error(&err)
    }
}
