//! 内存组织目录
//!
//! 进程内的 [`OrganizationDirectory`] 实现，用于单机运行与测试。
//! 不做持久化，只执行目录接口约定的校验规则并返回对应的平台错误码。

use super::{
    AttributeValues, DirectoryError, DirectoryErrorCode, DirectoryResult, OrganizationDirectory,
    OrganizationHandle, ServiceAttributes,
};
use crate::auth::AdminToken;
use crate::descriptor::{REPO_ALIAS_ATTRIBUTE, REPO_SERVICE, REPO_STATUS_ATTRIBUTE};
use crate::path::RealmPath;
use async_trait::async_trait;
use realmd_common::config::DirectoryConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const REPO_STATUS_VALUES: [&str; 2] = ["Active", "Inactive"];

#[derive(Debug, Default, Clone)]
struct OrganizationEntry {
    services: BTreeSet<String>,
    attributes: ServiceAttributes,
}

#[derive(Debug)]
struct MemoryState {
    admin_token: AdminToken,
    known_services: BTreeSet<String>,
    mandatory_services: BTreeSet<String>,
    realms: RwLock<BTreeMap<RealmPath, OrganizationEntry>>,
}

impl MemoryState {
    fn check_service_known(&self, service: &str) -> DirectoryResult<()> {
        if service == REPO_SERVICE || self.known_services.contains(service) {
            Ok(())
        } else {
            Err(DirectoryError::new(
                DirectoryErrorCode::ServiceNotFound,
                format!("Service {service} not found"),
            ))
        }
    }

    fn check_attributes(&self, service: &str, attributes: &AttributeValues) -> DirectoryResult<()> {
        self.check_service_known(service)?;
        if service != REPO_SERVICE {
            return Ok(());
        }

        for (name, values) in attributes {
            let valid = match name.as_str() {
                REPO_STATUS_ATTRIBUTE => values.iter().all(|v| {
                    REPO_STATUS_VALUES
                        .iter()
                        .any(|allowed| allowed.eq_ignore_ascii_case(v))
                }),
                REPO_ALIAS_ATTRIBUTE => true,
                _ => false,
            };
            if !valid {
                return Err(DirectoryError::new(
                    DirectoryErrorCode::AttributeValuesMismatch,
                    format!("Attribute {name} does not match schema of {service}"),
                ));
            }
        }
        Ok(())
    }
}

/// 内存组织目录
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    state: Arc<MemoryState>,
}

impl MemoryDirectory {
    pub fn builder(admin_token: AdminToken) -> MemoryDirectoryBuilder {
        MemoryDirectoryBuilder::new(admin_token)
    }

    /// 判断 realm 是否存在
    pub async fn contains_realm(&self, realm: &str) -> bool {
        match RealmPath::parse(realm) {
            Some(path) => self.state.realms.read().await.contains_key(&path),
            None => false,
        }
    }

    /// 所有 realm 路径（包括根）
    pub async fn realm_names(&self) -> Vec<String> {
        self.state
            .realms
            .read()
            .await
            .keys()
            .map(|path| path.to_string())
            .collect()
    }
}

#[async_trait]
impl OrganizationDirectory for MemoryDirectory {
    async fn open(
        &self,
        admin_token: &AdminToken,
        realm: &RealmPath,
    ) -> DirectoryResult<Box<dyn OrganizationHandle>> {
        if admin_token != &self.state.admin_token {
            return Err(DirectoryError::new(
                DirectoryErrorCode::InvalidToken,
                "Invalid SSO token",
            ));
        }

        if !self.state.realms.read().await.contains_key(realm) {
            return Err(DirectoryError::realm_not_found(realm));
        }

        Ok(Box::new(MemoryHandle {
            realm: realm.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

/// 内存目录构建器
#[derive(Debug)]
pub struct MemoryDirectoryBuilder {
    admin_token: AdminToken,
    known_services: BTreeSet<String>,
    mandatory_services: BTreeSet<String>,
    seed_realms: Vec<RealmPath>,
}

impl MemoryDirectoryBuilder {
    pub fn new(admin_token: AdminToken) -> Self {
        Self {
            admin_token,
            known_services: BTreeSet::new(),
            mandatory_services: BTreeSet::new(),
            seed_realms: Vec::new(),
        }
    }

    /// 从目录配置创建构建器
    pub fn from_config(config: &DirectoryConfig, admin_token: AdminToken) -> Self {
        let mut builder = Self::new(admin_token)
            .with_services(config.services.iter().cloned())
            .with_mandatory_services(config.mandatory_services.iter().cloned());

        for raw in &config.seed_realms {
            match RealmPath::parse(raw) {
                Some(path) => builder.seed_realms.push(path),
                None => warn!("Ignoring empty seed realm entry"),
            }
        }
        builder
    }

    pub fn with_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_services
            .extend(services.into_iter().map(Into::into));
        self
    }

    /// 强制服务同时登记为已知服务
    pub fn with_mandatory_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for service in services {
            let service = service.into();
            self.known_services.insert(service.clone());
            self.mandatory_services.insert(service);
        }
        self
    }

    /// 预置 realm（自动补齐祖先）
    pub fn with_realm(mut self, realm: &str) -> Self {
        if let Some(path) = RealmPath::parse(realm) {
            self.seed_realms.push(path);
        }
        self
    }

    pub fn build(self) -> MemoryDirectory {
        let mut realms = BTreeMap::new();
        realms.insert(RealmPath::root(), OrganizationEntry::default());

        for seed in &self.seed_realms {
            let mut current = RealmPath::root();
            for segment in seed.segments() {
                current = current.join(segment);
                realms.entry(current.clone()).or_default();
            }
        }

        info!(
            "Memory directory ready: {} realms, {} services ({} mandatory)",
            realms.len(),
            self.known_services.len(),
            self.mandatory_services.len()
        );

        MemoryDirectory {
            state: Arc::new(MemoryState {
                admin_token: self.admin_token,
                known_services: self.known_services,
                mandatory_services: self.mandatory_services,
                realms: RwLock::new(realms),
            }),
        }
    }
}

struct MemoryHandle {
    realm: RealmPath,
    state: Arc<MemoryState>,
}

impl MemoryHandle {
    fn not_found(&self) -> DirectoryError {
        DirectoryError::realm_not_found(&self.realm)
    }
}

#[async_trait]
impl OrganizationHandle for MemoryHandle {
    fn realm(&self) -> &RealmPath {
        &self.realm
    }

    async fn create_sub_organization(
        &self,
        child: &str,
        attributes: &ServiceAttributes,
    ) -> DirectoryResult<()> {
        if child.trim().is_empty() || child.contains('/') {
            return Err(DirectoryError::new(
                DirectoryErrorCode::InvalidOrganizationName,
                format!("Invalid organization name: {child:?}"),
            ));
        }

        for (service, values) in attributes {
            self.state.check_attributes(service, values)?;
        }

        let mut realms = self.state.realms.write().await;
        if !realms.contains_key(&self.realm) {
            return Err(self.not_found());
        }

        let path = self.realm.join(child);
        if realms.contains_key(&path) {
            return Err(DirectoryError::new(
                DirectoryErrorCode::OrganizationExists,
                format!("Organization {path} already exists"),
            ));
        }

        let entry = OrganizationEntry {
            services: attributes
                .keys()
                .filter(|service| service.as_str() != REPO_SERVICE)
                .cloned()
                .collect(),
            attributes: attributes.clone(),
        };
        realms.insert(path.clone(), entry);
        debug!("Created organization {}", path);
        Ok(())
    }

    async fn delete_sub_organization(&self, recursive: bool) -> DirectoryResult<()> {
        if self.realm.is_root() {
            return Err(DirectoryError::new(
                DirectoryErrorCode::CannotDeleteRootSuffix,
                "Cannot delete root suffix",
            ));
        }

        let mut realms = self.state.realms.write().await;
        if !realms.contains_key(&self.realm) {
            return Err(self.not_found());
        }

        let descendants: Vec<RealmPath> = realms
            .keys()
            .filter(|path| self.realm.is_ancestor_of(path))
            .cloned()
            .collect();

        if !descendants.is_empty() && !recursive {
            return Err(DirectoryError::new(
                DirectoryErrorCode::EntriesExist,
                format!("Organization {} has sub organizations", self.realm),
            ));
        }

        for path in descendants {
            realms.remove(&path);
        }
        realms.remove(&self.realm);
        debug!("Deleted organization {}", self.realm);
        Ok(())
    }

    async fn get_assigned_services(&self) -> DirectoryResult<BTreeSet<String>> {
        let realms = self.state.realms.read().await;
        let entry = realms.get(&self.realm).ok_or_else(|| self.not_found())?;

        let mut services = entry.services.clone();
        services.extend(self.state.mandatory_services.iter().cloned());
        Ok(services)
    }

    async fn assign_service(&self, service: &str) -> DirectoryResult<()> {
        self.state.check_service_known(service)?;

        let mut realms = self.state.realms.write().await;
        let entry = realms
            .get_mut(&self.realm)
            .ok_or_else(|| self.not_found())?;
        entry.services.insert(service.to_string());
        Ok(())
    }

    async fn unassign_service(&self, service: &str) -> DirectoryResult<()> {
        self.state.check_service_known(service)?;

        let mut realms = self.state.realms.write().await;
        let entry = realms
            .get_mut(&self.realm)
            .ok_or_else(|| self.not_found())?;

        if self.state.mandatory_services.contains(service) {
            debug!("Keeping mandatory service {} on {}", service, self.realm);
            return Ok(());
        }
        entry.services.remove(service);
        entry.attributes.remove(service);
        Ok(())
    }

    async fn set_attributes(
        &self,
        service: &str,
        attributes: &AttributeValues,
    ) -> DirectoryResult<()> {
        self.state.check_attributes(service, attributes)?;

        let mut realms = self.state.realms.write().await;
        let entry = realms
            .get_mut(&self.realm)
            .ok_or_else(|| self.not_found())?;

        let assigned = service == REPO_SERVICE
            || entry.services.contains(service)
            || self.state.mandatory_services.contains(service);
        if !assigned {
            return Err(DirectoryError::new(
                DirectoryErrorCode::NoOrganizationSchema,
                format!("No organization schema for {service} on {}", self.realm),
            ));
        }

        let current = entry.attributes.entry(service.to_string()).or_default();
        for (name, values) in attributes {
            current.insert(name.clone(), values.clone());
        }
        Ok(())
    }

    async fn get_attributes(&self, service: &str) -> DirectoryResult<AttributeValues> {
        self.state.check_service_known(service)?;

        let realms = self.state.realms.read().await;
        let entry = realms.get(&self.realm).ok_or_else(|| self.not_found())?;
        Ok(entry.attributes.get(service).cloned().unwrap_or_default())
    }

    async fn get_organization_name(&self) -> DirectoryResult<String> {
        let realms = self.state.realms.read().await;
        if realms.contains_key(&self.realm) {
            Ok(self.realm.to_string())
        } else {
            Err(self.not_found())
        }
    }

    async fn get_sub_organization_names(
        &self,
        recursive: bool,
    ) -> DirectoryResult<BTreeSet<String>> {
        let realms = self.state.realms.read().await;
        if !realms.contains_key(&self.realm) {
            return Err(self.not_found());
        }

        Ok(realms
            .keys()
            .filter(|path| {
                self.realm.is_ancestor_of(path) && (recursive || path.parent() == self.realm)
            })
            .map(|path| path.to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> AdminToken {
        AdminToken::new("admin-secret")
    }

    fn directory() -> MemoryDirectory {
        MemoryDirectory::builder(token())
            .with_services(["iPlanetAMAuthService", "sunAMAuthLDAPModule"])
            .with_mandatory_services(["AgentService"])
            .with_realm("/top/nested")
            .build()
    }

    fn path(raw: &str) -> RealmPath {
        RealmPath::parse(raw).unwrap()
    }

    fn repo_status(value: &str) -> ServiceAttributes {
        let mut attrs = AttributeValues::new();
        attrs.insert(
            REPO_STATUS_ATTRIBUTE.to_string(),
            BTreeSet::from([value.to_string()]),
        );
        BTreeMap::from([(REPO_SERVICE.to_string(), attrs)])
    }

    #[tokio::test]
    async fn test_open_rejects_wrong_token() {
        let dir = directory();
        let err = dir
            .open(&AdminToken::new("nope"), &RealmPath::root())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code, DirectoryErrorCode::InvalidToken);
    }

    #[tokio::test]
    async fn test_open_unknown_realm() {
        let dir = directory();
        let err = dir.open(&token(), &path("/ghost")).await.err().unwrap();
        assert!(err.is_realm_not_found());
    }

    #[tokio::test]
    async fn test_seed_realms_create_ancestors() {
        let dir = directory();
        assert!(dir.contains_realm("/top").await);
        assert!(dir.contains_realm("/top/nested").await);
        assert_eq!(dir.realm_names().await, vec!["/", "/top", "/top/nested"]);
    }

    #[tokio::test]
    async fn test_create_and_duplicate() {
        let dir = directory();
        let root = dir.open(&token(), &RealmPath::root()).await.unwrap();

        root.create_sub_organization("child", &repo_status("Active"))
            .await
            .unwrap();
        assert!(dir.contains_realm("/child").await);

        let err = root
            .create_sub_organization("child", &ServiceAttributes::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, DirectoryErrorCode::OrganizationExists);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_names() {
        let dir = directory();
        let root = dir.open(&token(), &RealmPath::root()).await.unwrap();

        for name in ["", "  ", "a/b"] {
            let err = root
                .create_sub_organization(name, &ServiceAttributes::new())
                .await
                .unwrap_err();
            assert_eq!(err.code, DirectoryErrorCode::InvalidOrganizationName);
        }
    }

    #[tokio::test]
    async fn test_create_validates_repository_schema() {
        let dir = directory();
        let root = dir.open(&token(), &RealmPath::root()).await.unwrap();

        let err = root
            .create_sub_organization("child", &repo_status("Sleeping"))
            .await
            .unwrap_err();
        assert_eq!(err.code, DirectoryErrorCode::AttributeValuesMismatch);
        assert!(!dir.contains_realm("/child").await);
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let dir = directory();

        let root = dir.open(&token(), &RealmPath::root()).await.unwrap();
        let err = root.delete_sub_organization(false).await.unwrap_err();
        assert_eq!(err.code, DirectoryErrorCode::CannotDeleteRootSuffix);

        let top = dir.open(&token(), &path("/top")).await.unwrap();
        let err = top.delete_sub_organization(false).await.unwrap_err();
        assert_eq!(err.code, DirectoryErrorCode::EntriesExist);

        top.delete_sub_organization(true).await.unwrap();
        assert!(!dir.contains_realm("/top").await);
        assert!(!dir.contains_realm("/top/nested").await);

        // 句柄失效后再操作返回 not found
        let err = top.get_assigned_services().await.unwrap_err();
        assert!(err.is_realm_not_found());
    }

    #[tokio::test]
    async fn test_service_assignment() {
        let dir = directory();
        let top = dir.open(&token(), &path("/top")).await.unwrap();

        assert_eq!(
            top.get_assigned_services().await.unwrap(),
            BTreeSet::from(["AgentService".to_string()])
        );

        top.assign_service("iPlanetAMAuthService").await.unwrap();
        let err = top.assign_service("NoSuchService").await.unwrap_err();
        assert_eq!(err.code, DirectoryErrorCode::ServiceNotFound);

        top.unassign_service("AgentService").await.unwrap();
        top.unassign_service("iPlanetAMAuthService").await.unwrap();
        assert_eq!(
            top.get_assigned_services().await.unwrap(),
            BTreeSet::from(["AgentService".to_string()])
        );
    }

    #[tokio::test]
    async fn test_set_attributes_requires_assignment() {
        let dir = directory();
        let top = dir.open(&token(), &path("/top")).await.unwrap();

        let attrs = AttributeValues::from([(
            "iplanet-am-auth-dynamic-profile-creation".to_string(),
            BTreeSet::from(["true".to_string()]),
        )]);

        let err = top
            .set_attributes("iPlanetAMAuthService", &attrs)
            .await
            .unwrap_err();
        assert_eq!(err.code, DirectoryErrorCode::NoOrganizationSchema);

        top.assign_service("iPlanetAMAuthService").await.unwrap();
        top.set_attributes("iPlanetAMAuthService", &attrs)
            .await
            .unwrap();
        assert_eq!(
            top.get_attributes("iPlanetAMAuthService").await.unwrap(),
            attrs
        );
    }

    #[tokio::test]
    async fn test_repository_attributes_are_merged() {
        let dir = directory();
        let top = dir.open(&token(), &path("/top")).await.unwrap();

        top.set_attributes(REPO_SERVICE, &repo_status("Inactive")[REPO_SERVICE])
            .await
            .unwrap();

        let alias = AttributeValues::from([(
            REPO_ALIAS_ATTRIBUTE.to_string(),
            BTreeSet::from(["top.example.com".to_string()]),
        )]);
        top.set_attributes(REPO_SERVICE, &alias).await.unwrap();

        let stored = top.get_attributes(REPO_SERVICE).await.unwrap();
        assert_eq!(stored.len(), 2);

        let unknown = AttributeValues::from([("color".to_string(), BTreeSet::new())]);
        let err = top.set_attributes(REPO_SERVICE, &unknown).await.unwrap_err();
        assert_eq!(err.code, DirectoryErrorCode::AttributeValuesMismatch);
    }

    #[tokio::test]
    async fn test_sub_organization_names() {
        let dir = directory();
        let root = dir.open(&token(), &RealmPath::root()).await.unwrap();
        root.create_sub_organization("other", &ServiceAttributes::new())
            .await
            .unwrap();

        let direct = root.get_sub_organization_names(false).await.unwrap();
        assert_eq!(
            direct,
            BTreeSet::from(["/other".to_string(), "/top".to_string()])
        );

        let all = root.get_sub_organization_names(true).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.contains("/top/nested"));
    }
}
