//! 组织目录抽象接口
//!
//! Realm 层级、服务分配与服务属性都保存在外部组织目录中。
//! 资源提供者只通过这里定义的异步接口访问目录。

pub mod error;
pub mod memory;

pub use error::{DirectoryError, DirectoryErrorCode, DirectoryResult};
pub use memory::{MemoryDirectory, MemoryDirectoryBuilder};

use crate::auth::AdminToken;
use crate::path::RealmPath;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

/// 单个服务的属性：属性名 -> 值集合
pub type AttributeValues = BTreeMap<String, BTreeSet<String>>;

/// 服务属性映射：服务名 -> 属性
pub type ServiceAttributes = BTreeMap<String, AttributeValues>;

/// 组织目录
///
/// 以管理员令牌打开某个 realm，返回该 realm 的操作句柄。
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    /// 打开 realm
    ///
    /// # Errors
    /// * `sms-INVALID_SSO_TOKEN` - 令牌无效
    /// * `sms-REALM_NAME_NOT_FOUND` - realm 不存在
    async fn open(
        &self,
        admin_token: &AdminToken,
        realm: &RealmPath,
    ) -> DirectoryResult<Box<dyn OrganizationHandle>>;
}

/// 已打开的 realm 句柄
#[async_trait]
pub trait OrganizationHandle: Send + Sync {
    /// 句柄对应的 realm 路径
    fn realm(&self) -> &RealmPath;

    /// 在当前 realm 下创建子 realm，并写入初始服务属性
    async fn create_sub_organization(
        &self,
        child: &str,
        attributes: &ServiceAttributes,
    ) -> DirectoryResult<()>;

    /// 删除当前 realm；`recursive = false` 时存在子 realm 会失败
    async fn delete_sub_organization(&self, recursive: bool) -> DirectoryResult<()>;

    /// 当前已分配的服务名
    async fn get_assigned_services(&self) -> DirectoryResult<BTreeSet<String>>;

    async fn assign_service(&self, service: &str) -> DirectoryResult<()>;

    /// 取消分配服务；强制服务保持分配状态
    async fn unassign_service(&self, service: &str) -> DirectoryResult<()>;

    /// 合并写入指定服务的属性（覆盖同名属性）
    async fn set_attributes(&self, service: &str, attributes: &AttributeValues)
    -> DirectoryResult<()>;

    /// 读取指定服务的属性
    ///
    /// 属于目录契约的读取面，目前 realm 资源操作不调用，供其他目录使用方读取服务配置。
    async fn get_attributes(&self, service: &str) -> DirectoryResult<AttributeValues>;

    /// 组织名称（完整路径形式）
    async fn get_organization_name(&self) -> DirectoryResult<String>;

    /// 子 realm 的完整路径；`recursive = true` 时包含所有后代
    async fn get_sub_organization_names(&self, recursive: bool)
    -> DirectoryResult<BTreeSet<String>>;
}
