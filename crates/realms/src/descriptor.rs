//! Realm 请求负载
//!
//! 请求体在进入资源提供者之前解析为 [`RealmDescriptor`]，
//! 结构不符的负载在边界处被拒绝。

use crate::directory::{AttributeValues, ServiceAttributes};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 身份仓库服务名
pub const REPO_SERVICE: &str = "sunIdentityRepositoryService";
/// 身份仓库 realm 状态属性
pub const REPO_STATUS_ATTRIBUTE: &str = "sunOrganizationStatus";
/// 身份仓库 realm/DNS 别名属性
pub const REPO_ALIAS_ATTRIBUTE: &str = "sunOrganizationAliases";
/// 未指定状态时新建 realm 的默认状态
pub const DEFAULT_REALM_STATUS: &str = "Active";

/// Realm 描述（请求负载）
///
/// ```json
/// {
///   "realm": "/parent/child",
///   "serviceNames": ["iPlanetAMAuthService"],
///   "sunOrganizationStatus": "Active",
///   "sunOrganizationAliases": "child.example.com",
///   "iPlanetAMAuthService": { "iplanet-am-auth-locale": ["en_US"] }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_names: Option<Vec<String>>,

    #[serde(
        rename = "sunOrganizationStatus",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,

    #[serde(
        rename = "sunOrganizationAliases",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub aliases: Option<String>,

    /// 其余字段：附加的服务属性块
    #[serde(flatten)]
    pub services: ServiceAttributes,
}

impl RealmDescriptor {
    /// 目标 realm 名称，去除首尾空白；空值返回 None
    pub fn realm_name(&self) -> Option<&str> {
        self.realm
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// 期望分配的服务名（未提供时为空）
    pub fn service_names(&self) -> &[String] {
        self.service_names.as_deref().unwrap_or_default()
    }

    /// 请求中提供的身份仓库属性（仅包含出现的字段）
    pub fn repository_attributes(&self) -> AttributeValues {
        let mut attributes = AttributeValues::new();
        if let Some(status) = non_empty(self.status.as_deref()) {
            attributes.insert(
                REPO_STATUS_ATTRIBUTE.to_string(),
                BTreeSet::from([status.to_string()]),
            );
        }
        if let Some(alias) = non_empty(self.aliases.as_deref()) {
            attributes.insert(
                REPO_ALIAS_ATTRIBUTE.to_string(),
                BTreeSet::from([alias.to_string()]),
            );
        }
        attributes
    }

    /// 新建 realm 时写入的服务属性
    ///
    /// 身份仓库状态缺省为 `Active`，别名非空时写入；附加服务块原样合并。
    pub fn default_service_attributes(&self) -> ServiceAttributes {
        let mut repository = self.repository_attributes();
        repository
            .entry(REPO_STATUS_ATTRIBUTE.to_string())
            .or_insert_with(|| BTreeSet::from([DEFAULT_REALM_STATUS.to_string()]));

        let mut attributes: ServiceAttributes = self.extra_services().clone();
        attributes
            .entry(REPO_SERVICE.to_string())
            .or_default()
            .extend(repository);
        attributes
    }

    /// 附加的服务属性块
    pub fn extra_services(&self) -> &BTreeMap<String, AttributeValues> {
        &self.services
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
