//! Realm 资源提供者
//!
//! 将集合资源协议的操作（create/read/update/delete/query/action/patch）
//! 转换为对组织目录的调用，并把目录错误转换为资源错误。
//!
//! 每个操作恰好产生一个结果；query 先向 [`QueryResultHandler`] 推送零或多个资源，
//! 再返回结果。

use crate::auth::{AdminCredentialProvider, AdminToken, AuthorizationCheck};
use crate::descriptor::{REPO_SERVICE, RealmDescriptor};
use crate::directory::{
    DirectoryError, DirectoryResult, OrganizationDirectory, OrganizationHandle,
};
use crate::error::{ResourceError, ResourceResult, map_directory_error};
use crate::metrics::record_outcome;
use crate::path::{RealmPath, collection_parent};
use crate::request::{ActionRequest, CreateRequest, PatchRequest, RequestContext, UpdateRequest};
use crate::resource::{QueryResult, QueryResultHandler, Resource};
use crate::services::reconcile_services;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 更新步骤的结果
#[derive(Debug)]
pub enum UpdateOutcome {
    /// realm 存在且已更新
    Updated(Resource),
    /// realm 不存在，需要转为创建
    Missing,
}

/// Realm 资源提供者
#[derive(Clone)]
pub struct RealmResourceProvider {
    directory: Arc<dyn OrganizationDirectory>,
    authorizer: Arc<dyn AuthorizationCheck>,
    admin_token: AdminToken,
    sub_realms: Arc<BTreeSet<String>>,
}

impl std::fmt::Debug for RealmResourceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealmResourceProvider")
            .field("admin_token", &self.admin_token)
            .field("sub_realms", &self.sub_realms.len())
            .finish()
    }
}

impl RealmResourceProvider {
    pub fn new(
        directory: Arc<dyn OrganizationDirectory>,
        authorizer: Arc<dyn AuthorizationCheck>,
        credentials: &dyn AdminCredentialProvider,
    ) -> Self {
        Self {
            directory,
            authorizer,
            admin_token: credentials.admin_token(),
            sub_realms: Arc::new(BTreeSet::new()),
        }
    }

    /// 设置 query 返回的子 realm 名称
    pub fn with_sub_realms<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_realms = Arc::new(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn sub_realms(&self) -> &BTreeSet<String> {
        &self.sub_realms
    }

    pub fn has_permission(&self, context: &RequestContext) -> bool {
        self.authorizer.has_permission(context)
    }

    /// 以 `parent` 下的全部子 realm 作为 query 范围
    ///
    /// 无权限时不访问目录，直接返回原提供者（随后的 query 会返回 401）。
    pub async fn scoped_to(
        &self,
        context: &RequestContext,
        parent: &RealmPath,
    ) -> ResourceResult<Self> {
        if !self.has_permission(context) {
            return Ok(self.clone());
        }

        let names = async {
            let handle = self.open(parent).await?;
            handle.get_sub_organization_names(true).await
        }
        .await
        .map_err(|e| self.fail("query", parent, e))?;

        Ok(self.clone().with_sub_realms(names))
    }

    async fn open(&self, realm: &RealmPath) -> DirectoryResult<Box<dyn OrganizationHandle>> {
        self.directory.open(&self.admin_token, realm).await
    }

    fn fail(&self, operation: &str, realm: &RealmPath, err: DirectoryError) -> ResourceError {
        error!(
            "RealmResource.{}() failed for {}: {} [{}]",
            operation, realm, err.message, err.code
        );
        map_directory_error(&err)
    }

    fn deny(&self, operation: &str) -> ResourceError {
        warn!("RealmResource.{}() rejected: caller lacks permission", operation);
        ResourceError::unauthorized()
    }

    /// 创建 realm
    pub async fn create(
        &self,
        context: &RequestContext,
        request: &CreateRequest,
    ) -> ResourceResult<Resource> {
        let result = self.create_instance(context, request).await;
        record_outcome("create", &result);
        result
    }

    async fn create_instance(
        &self,
        context: &RequestContext,
        request: &CreateRequest,
    ) -> ResourceResult<Resource> {
        if !self.has_permission(context) {
            return Err(self.deny("createInstance"));
        }

        let Some(name) = request.content.realm_name() else {
            return Err(ResourceError::bad_request("No realm name provided."));
        };

        let parent = collection_parent(&request.resource_name);
        let realm = RealmPath::resolve(&parent, name);
        debug!("Creating realm {} (resource {})", realm, request.resource_name);

        self.create_realm(&realm, &request.content)
            .await
            .map_err(|e| self.fail("createInstance", &realm, e))
    }

    /// 在 `realm` 的父 realm 下创建子 realm，并按请求对齐服务
    async fn create_realm(
        &self,
        realm: &RealmPath,
        content: &RealmDescriptor,
    ) -> DirectoryResult<Resource> {
        let parent = self.open(&realm.parent()).await?;
        parent
            .create_sub_organization(realm.child_name(), &content.default_service_attributes())
            .await?;

        let created = self.open(realm).await?;
        if let Err(e) = reconcile_services(created.as_ref(), content.service_names()).await {
            warn!(
                "Realm {} was created but service assignment failed: {}",
                realm, e
            );
            return Err(e);
        }

        let name = created.get_organization_name().await?;
        info!("Realm {} created", name);
        Ok(Resource::message(realm.as_str(), "realmCreated", name))
    }

    /// 读取 realm 已分配的服务
    pub async fn read(
        &self,
        context: &RequestContext,
        resource_id: &str,
    ) -> ResourceResult<Resource> {
        let result = self.read_instance(context, resource_id).await;
        record_outcome("read", &result);
        result
    }

    async fn read_instance(
        &self,
        context: &RequestContext,
        resource_id: &str,
    ) -> ResourceResult<Resource> {
        if !self.has_permission(context) {
            return Err(self.deny("readInstance"));
        }

        let realm = RealmPath::parse(resource_id).unwrap_or_else(RealmPath::root);
        let services = async {
            let handle = self.open(&realm).await?;
            handle.get_assigned_services().await
        }
        .await
        .map_err(|e| self.fail("readInstance", &realm, e))?;

        Ok(Resource::new(
            realm.as_str(),
            json!({ "serviceNames": services }),
        ))
    }

    /// 更新 realm；realm 不存在时转为创建
    pub async fn update(
        &self,
        context: &RequestContext,
        resource_id: &str,
        request: &UpdateRequest,
    ) -> ResourceResult<Resource> {
        let result = self.update_instance(context, resource_id, request).await;
        record_outcome("update", &result);
        result
    }

    async fn update_instance(
        &self,
        context: &RequestContext,
        resource_id: &str,
        request: &UpdateRequest,
    ) -> ResourceResult<Resource> {
        if !self.has_permission(context) {
            return Err(self.deny("updateInstance"));
        }

        let realm = RealmPath::parse(resource_id).unwrap_or_else(RealmPath::root);

        match self.try_update(&realm, &request.content).await {
            Ok(UpdateOutcome::Updated(resource)) => Ok(resource),
            Ok(UpdateOutcome::Missing) => {
                warn!("Cannot find realm {}, creating it", realm);
                self.create_realm(&realm, &request.content)
                    .await
                    .map_err(|e| self.fail("updateInstance", &realm, e))
            }
            Err(e) => Err(self.fail("updateInstance", &realm, e)),
        }
    }

    /// 更新步骤；仅 realm 不存在的错误转为 [`UpdateOutcome::Missing`]
    pub async fn try_update(
        &self,
        realm: &RealmPath,
        content: &RealmDescriptor,
    ) -> DirectoryResult<UpdateOutcome> {
        match self.apply_update(realm, content).await {
            Ok(name) => Ok(UpdateOutcome::Updated(Resource::message(
                realm.as_str(),
                "realmUpdated",
                name,
            ))),
            Err(e) if e.is_realm_not_found() => Ok(UpdateOutcome::Missing),
            Err(e) => Err(e),
        }
    }

    async fn apply_update(
        &self,
        realm: &RealmPath,
        content: &RealmDescriptor,
    ) -> DirectoryResult<String> {
        let handle = self.open(realm).await?;

        handle
            .set_attributes(REPO_SERVICE, &content.repository_attributes())
            .await?;
        reconcile_services(handle.as_ref(), content.service_names()).await?;

        for (service, attributes) in content.extra_services() {
            handle.set_attributes(service, attributes).await?;
        }

        let name = handle.get_organization_name().await?;
        info!("Realm {} updated", name);
        Ok(name)
    }

    /// 删除 realm（非递归）
    pub async fn delete(
        &self,
        context: &RequestContext,
        resource_id: &str,
    ) -> ResourceResult<Resource> {
        let result = self.delete_instance(context, resource_id).await;
        record_outcome("delete", &result);
        result
    }

    async fn delete_instance(
        &self,
        context: &RequestContext,
        resource_id: &str,
    ) -> ResourceResult<Resource> {
        if !self.has_permission(context) {
            return Err(self.deny("deleteInstance"));
        }

        let realm = RealmPath::parse(resource_id).unwrap_or_else(RealmPath::root);
        async {
            let handle = self.open(&realm).await?;
            handle.delete_sub_organization(false).await
        }
        .await
        .map_err(|e| self.fail("deleteInstance", &realm, e))?;

        info!("Realm {} deleted", realm);
        Ok(Resource::message(realm.as_str(), "success", "true"))
    }

    /// 列出子 realm
    pub async fn query(
        &self,
        context: &RequestContext,
        handler: &mut dyn QueryResultHandler,
    ) -> ResourceResult<QueryResult> {
        let result = self.query_collection(context, handler);
        record_outcome("query", &result);
        result
    }

    fn query_collection(
        &self,
        context: &RequestContext,
        handler: &mut dyn QueryResultHandler,
    ) -> ResourceResult<QueryResult> {
        if !self.has_permission(context) {
            return Err(self.deny("queryCollection"));
        }

        for name in self.sub_realms.iter() {
            if !handler.handle_resource(Resource::new(name.as_str(), json!(name))) {
                debug!("Query handler stopped after {}", name);
                break;
            }
        }
        Ok(QueryResult::default())
    }

    pub async fn action_collection(
        &self,
        _context: &RequestContext,
        _request: &ActionRequest,
    ) -> ResourceResult<serde_json::Value> {
        let result = Err(ResourceError::not_supported(
            "Actions are not supported for resource instances",
        ));
        record_outcome("action", &result);
        result
    }

    pub async fn action_instance(
        &self,
        _context: &RequestContext,
        _resource_id: &str,
        _request: &ActionRequest,
    ) -> ResourceResult<serde_json::Value> {
        let result = Err(ResourceError::not_supported(
            "Actions are not supported for resource Realms",
        ));
        record_outcome("action", &result);
        result
    }

    pub async fn patch(
        &self,
        _context: &RequestContext,
        _resource_id: &str,
        _request: &PatchRequest,
    ) -> ResourceResult<Resource> {
        let result = Err(ResourceError::not_supported(
            "Patch operations are not supported for resource Realms",
        ));
        record_outcome("patch", &result);
        result
    }
}
