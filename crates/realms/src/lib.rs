//! Realm 资源提供者
//!
//! 将 REST 集合资源 `realms` 的 CRUD 操作翻译为组织配置目录调用：
//! 1. 创建 / 读取 / 更新 / 删除子 realm，列出父 realm 下的子 realm
//! 2. 目录错误码统一翻译为带 HTTP 状态的资源错误
//! 3. 内存组织目录实现（服务注册、属性校验、层级删除）

pub mod auth;
pub mod descriptor;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod path;
pub mod provider;
pub mod request;
pub mod resource;
pub mod services;

// Re-export commonly used items
pub use auth::{
    AdminCredentialProvider, AdminToken, AdminTokenAuthorizer, AuthorizationCheck,
    StaticCredentialProvider,
};
pub use descriptor::RealmDescriptor;
pub use directory::{
    DirectoryError, DirectoryErrorCode, DirectoryResult, MemoryDirectory, MemoryDirectoryBuilder,
    OrganizationDirectory, OrganizationHandle,
};
pub use error::{ErrorKind, ResourceError, ResourceResult, map_directory_error};
pub use handlers::{RealmRoute, RealmsState, create_realms_state, create_router};
pub use metrics::register_realm_metrics;
pub use path::RealmPath;
pub use provider::{RealmResourceProvider, UpdateOutcome};
pub use request::{ActionRequest, CreateRequest, PatchRequest, RequestContext, UpdateRequest};
pub use resource::{QueryResult, QueryResultHandler, Resource};
