//! Realm HTTP 处理器
//!
//! 集合资源路由：`{parent}/realms` 为集合，`{parent}/realms/{name}` 为实例。
//! 路由器挂载在配置的前缀（默认 `/json`）之下。

use crate::auth::{AdminCredentialProvider, AdminTokenAuthorizer, StaticCredentialProvider};
use crate::descriptor::RealmDescriptor;
use crate::directory::MemoryDirectoryBuilder;
use crate::error::{ResourceError, ResourceResult};
use crate::path::{REALMS_COLLECTION, RealmPath};
use crate::provider::RealmResourceProvider;
use crate::request::{ActionRequest, CreateRequest, PatchRequest, RequestContext, UpdateRequest};
use crate::resource::{Resource, query_response_body};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use realmd_common::config::RealmdConfig;
use realmd_common::error::ConfigError;
use realmd_common::metrics::{AUTH_FAILURES, INVALID_REQUESTS, RequestTimer};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

const SERVICE_LABEL: &str = "realms";

/// Realm 服务状态
#[derive(Clone, Debug)]
pub struct RealmsState {
    pub provider: RealmResourceProvider,
    pub token_header: HeaderName,
}

impl RealmsState {
    pub fn new(provider: RealmResourceProvider, token_header: HeaderName) -> Self {
        Self {
            provider,
            token_header,
        }
    }

    /// 从请求头（或同名 Cookie）读取调用方令牌
    pub fn caller_context(&self, headers: &HeaderMap) -> RequestContext {
        if let Some(token) = headers
            .get(&self.token_header)
            .and_then(|v| v.to_str().ok())
        {
            return RequestContext::with_token(token.trim());
        }

        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| name.eq_ignore_ascii_case(self.token_header.as_str()))
            .map(|(_, value)| RequestContext::with_token(value.trim()))
            .unwrap_or_default()
    }
}

/// 从配置创建 RealmsState
///
/// 组织目录使用内存实现，按 `directory` 段预置服务与 realm。
pub fn create_realms_state(config: &RealmdConfig) -> Result<RealmsState, ConfigError> {
    let token_header = HeaderName::from_bytes(config.api.token_header.trim().as_bytes())
        .map_err(|_| ConfigError::invalid_value("api.token_header", &config.api.token_header))?;

    let credentials = StaticCredentialProvider::new(config.admin.admin_token.clone());
    let directory =
        MemoryDirectoryBuilder::from_config(&config.directory, credentials.admin_token()).build();

    let authorizer = AdminTokenAuthorizer::new(&config.admin.super_admin_tokens);
    info!(
        "Realm provider ready: {} super admin token(s), token header {}",
        authorizer.len(),
        token_header
    );

    let provider = RealmResourceProvider::new(Arc::new(directory), Arc::new(authorizer), &credentials);
    Ok(RealmsState::new(provider, token_header))
}

/// 创建 Realm 服务的路由
pub fn create_router(state: RealmsState) -> Router {
    Router::new()
        .route("/health", get(health_check_handler))
        .route(
            "/{*path}",
            get(get_handler)
                .post(post_handler)
                .put(put_handler)
                .delete(delete_handler)
                .patch(patch_handler),
        )
        .with_state(state)
}

/// 路由目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealmRoute {
    /// `{parent}/realms`
    Collection {
        parent: RealmPath,
        resource_name: String,
    },
    /// `{parent}/realms/{name}`，`realm` 为完整路径
    Instance { realm: RealmPath },
}

impl RealmRoute {
    /// 解析请求路径；以最后一个 `realms` 段作为集合段
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let idx = segments.iter().rposition(|s| *s == REALMS_COLLECTION)?;

        let parent = RealmPath::parse(&segments[..idx].join("/")).unwrap_or_else(RealmPath::root);
        if idx + 1 == segments.len() {
            return Some(RealmRoute::Collection {
                resource_name: format!("/{}", segments.join("/")),
                parent,
            });
        }

        let realm = RealmPath::resolve(&parent, &segments[idx + 1..].join("/"));
        Some(RealmRoute::Instance { realm })
    }

    fn metric_path(&self) -> &'static str {
        match self {
            RealmRoute::Collection { .. } => "/realms",
            RealmRoute::Instance { .. } => "/realms/{name}",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ActionParams {
    #[serde(rename = "_action")]
    action: Option<String>,
}

fn route_or_not_found(path: &str) -> ResourceResult<RealmRoute> {
    RealmRoute::parse(path)
        .ok_or_else(|| ResourceError::not_found(format!("Resource '{path}' not found")))
}

/// 无权限时先返回 401，再解析请求体
fn authorized_descriptor(
    state: &RealmsState,
    context: &RequestContext,
    body: &Bytes,
) -> ResourceResult<RealmDescriptor> {
    if !state.provider.has_permission(context) {
        return Err(ResourceError::unauthorized());
    }
    parse_descriptor(body)
}

/// 解析请求体；空请求体视为空描述
fn parse_descriptor(body: &Bytes) -> ResourceResult<RealmDescriptor> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RealmDescriptor::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        INVALID_REQUESTS
            .with_label_values(&[SERVICE_LABEL, "malformed_payload"])
            .inc();
        ResourceError::bad_request(format!("Invalid realm payload: {e}")).with_source(e)
    })
}

fn resource_response(status: StatusCode, resource: Resource) -> Response {
    (status, Json(resource.into_content())).into_response()
}

/// 统一记录请求指标与认证失败
fn finish(timer: RequestTimer, result: ResourceResult<Response>) -> Response {
    let response = result.unwrap_or_else(|e| {
        if e.status_code() == StatusCode::UNAUTHORIZED {
            AUTH_FAILURES
                .with_label_values(&[SERVICE_LABEL, "unauthorized"])
                .inc();
        }
        e.into_response()
    });
    timer.observe(response.status().as_u16());
    response
}

fn unsupported_on_collection(method: &Method) -> ResourceError {
    ResourceError::not_supported(format!(
        "{method} operations are not supported for the realms collection"
    ))
}

async fn get_handler(
    State(state): State<RealmsState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    let route = RealmRoute::parse(&path);
    let timer = RequestTimer::new(
        SERVICE_LABEL,
        "GET",
        route.as_ref().map_or("unknown", RealmRoute::metric_path),
    );

    let result: ResourceResult<Response> = async {
        let context = state.caller_context(&headers);
        match route_or_not_found(&path)? {
            RealmRoute::Collection { parent, .. } => {
                debug!("Querying realms under {}", parent);
                let scoped = state.provider.scoped_to(&context, &parent).await?;
                let mut resources: Vec<Resource> = Vec::new();
                scoped.query(&context, &mut resources).await?;
                Ok(Json(query_response_body(&resources)).into_response())
            }
            RealmRoute::Instance { realm } => {
                let resource = state.provider.read(&context, realm.as_str()).await?;
                Ok(resource_response(StatusCode::OK, resource))
            }
        }
    }
    .await;

    finish(timer, result)
}

async fn post_handler(
    State(state): State<RealmsState>,
    Path(path): Path<String>,
    Query(params): Query<ActionParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let route = RealmRoute::parse(&path);
    let timer = RequestTimer::new(
        SERVICE_LABEL,
        "POST",
        route.as_ref().map_or("unknown", RealmRoute::metric_path),
    );

    let result: ResourceResult<Response> = async {
        let context = state.caller_context(&headers);
        let action = params.action.unwrap_or_else(|| "create".to_string());

        match route_or_not_found(&path)? {
            RealmRoute::Collection { resource_name, .. } if action == "create" => {
                let content = authorized_descriptor(&state, &context, &body)?;
                let request = CreateRequest::new(resource_name, content);
                let resource = state.provider.create(&context, &request).await?;
                Ok(resource_response(StatusCode::CREATED, resource))
            }
            RealmRoute::Collection { .. } => {
                let request = ActionRequest {
                    action,
                    content: serde_json::from_slice(&body).unwrap_or_default(),
                };
                let value = state.provider.action_collection(&context, &request).await?;
                Ok(Json(value).into_response())
            }
            RealmRoute::Instance { realm } => {
                let request = ActionRequest {
                    action,
                    content: serde_json::from_slice(&body).unwrap_or_default(),
                };
                let value = state
                    .provider
                    .action_instance(&context, realm.as_str(), &request)
                    .await?;
                Ok(Json(value).into_response())
            }
        }
    }
    .await;

    finish(timer, result)
}

async fn put_handler(
    State(state): State<RealmsState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let route = RealmRoute::parse(&path);
    let timer = RequestTimer::new(
        SERVICE_LABEL,
        "PUT",
        route.as_ref().map_or("unknown", RealmRoute::metric_path),
    );

    let result: ResourceResult<Response> = async {
        let context = state.caller_context(&headers);
        match route_or_not_found(&path)? {
            RealmRoute::Collection { .. } => Err(unsupported_on_collection(&Method::PUT)),
            RealmRoute::Instance { realm } => {
                let request =
                    UpdateRequest::new(authorized_descriptor(&state, &context, &body)?);
                let resource = state
                    .provider
                    .update(&context, realm.as_str(), &request)
                    .await?;
                Ok(resource_response(StatusCode::OK, resource))
            }
        }
    }
    .await;

    finish(timer, result)
}

async fn delete_handler(
    State(state): State<RealmsState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    let route = RealmRoute::parse(&path);
    let timer = RequestTimer::new(
        SERVICE_LABEL,
        "DELETE",
        route.as_ref().map_or("unknown", RealmRoute::metric_path),
    );

    let result: ResourceResult<Response> = async {
        let context = state.caller_context(&headers);
        match route_or_not_found(&path)? {
            RealmRoute::Collection { .. } => Err(unsupported_on_collection(&Method::DELETE)),
            RealmRoute::Instance { realm } => {
                let resource = state.provider.delete(&context, realm.as_str()).await?;
                Ok(resource_response(StatusCode::OK, resource))
            }
        }
    }
    .await;

    finish(timer, result)
}

async fn patch_handler(
    State(state): State<RealmsState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let route = RealmRoute::parse(&path);
    let timer = RequestTimer::new(
        SERVICE_LABEL,
        "PATCH",
        route.as_ref().map_or("unknown", RealmRoute::metric_path),
    );

    let result: ResourceResult<Response> = async {
        let context = state.caller_context(&headers);
        match route_or_not_found(&path)? {
            RealmRoute::Collection { .. } => Err(unsupported_on_collection(&Method::PATCH)),
            RealmRoute::Instance { realm } => {
                let request = PatchRequest {
                    operations: serde_json::from_slice(&body).unwrap_or_default(),
                };
                let resource = state
                    .provider
                    .patch(&context, realm.as_str(), &request)
                    .await?;
                Ok(resource_response(StatusCode::OK, resource))
            }
        }
    }
    .await;

    finish(timer, result)
}

async fn health_check_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": SERVICE_LABEL,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const CALLER: &str = "caller-admin-token-0123456789";

    fn test_config() -> RealmdConfig {
        let mut config = RealmdConfig::default();
        config.admin.admin_token = "directory-admin-token-0123456789".to_string();
        config.admin.super_admin_tokens = vec![CALLER.to_string()];
        config.directory.services = vec!["iPlanetAMAuthService".to_string()];
        config.directory.mandatory_services = vec!["AgentService".to_string()];
        config.directory.seed_realms = vec!["/top".to_string()];
        config
    }

    fn create_test_app() -> Router {
        create_router(create_realms_state(&test_config()).unwrap())
    }

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("iPlanetDirectoryPro", token);
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[test]
    fn test_route_parsing() {
        assert_eq!(
            RealmRoute::parse("realms"),
            Some(RealmRoute::Collection {
                parent: RealmPath::root(),
                resource_name: "/realms".to_string(),
            })
        );
        assert_eq!(
            RealmRoute::parse("top/realms"),
            Some(RealmRoute::Collection {
                parent: RealmPath::parse("/top").unwrap(),
                resource_name: "/top/realms".to_string(),
            })
        );
        assert_eq!(
            RealmRoute::parse("realms/child"),
            Some(RealmRoute::Instance {
                realm: RealmPath::parse("/child").unwrap()
            })
        );
        assert_eq!(
            RealmRoute::parse("top/realms/child"),
            Some(RealmRoute::Instance {
                realm: RealmPath::parse("/top/child").unwrap()
            })
        );
        assert_eq!(RealmRoute::parse("users/bob"), None);
    }

    #[test]
    fn test_caller_context_from_header_and_cookie() {
        let state = create_realms_state(&test_config()).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("iplanetdirectorypro", CALLER.parse().unwrap());
        assert_eq!(state.caller_context(&headers).token(), Some(CALLER));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("amlbcookie=01; iPlanetDirectoryPro={CALLER}")
                .parse()
                .unwrap(),
        );
        assert_eq!(state.caller_context(&headers).token(), Some(CALLER));

        assert_eq!(state.caller_context(&HeaderMap::new()).token(), None);
    }

    #[test]
    fn test_invalid_token_header_is_config_error() {
        let mut config = test_config();
        config.api.token_header = "bad header".to_string();
        assert!(create_realms_state(&config).is_err());
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = send(create_test_app(), "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let app = create_test_app();

        let (status, body) = send(
            app.clone(),
            "POST",
            "/top/realms?_action=create",
            Some(CALLER),
            Some(json!({ "realm": "child", "serviceNames": ["iPlanetAMAuthService"] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({ "realmCreated": "/top/child" }));

        let (status, body) = send(app, "GET", "/top/realms/child", Some(CALLER), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "serviceNames": ["AgentService", "iPlanetAMAuthService"] })
        );
    }

    #[tokio::test]
    async fn test_create_without_token_is_unauthorized() {
        let (status, body) = send(
            create_test_app(),
            "POST",
            "/realms?_action=create",
            None,
            Some(json!({ "realm": "child" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 401);
        assert_eq!(body["message"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_malformed_payload_without_token_is_unauthorized() {
        let app = create_test_app();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/realms?_action=create")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"realm": 42}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/realms/top")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_bad_request() {
        let (status, body) = send(
            create_test_app(),
            "POST",
            "/realms?_action=create",
            Some(CALLER),
            Some(json!({ "realm": ["not", "a", "string"] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn test_query_lists_sub_realms() {
        let (status, body) = send(create_test_app(), "GET", "/realms", Some(CALLER), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "result": ["/top"], "resultCount": 1 }));
    }

    #[tokio::test]
    async fn test_update_missing_realm_creates_it() {
        let (status, body) = send(
            create_test_app(),
            "PUT",
            "/realms/fresh",
            Some(CALLER),
            Some(json!({ "sunOrganizationStatus": "Active" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "realmCreated": "/fresh" }));
    }

    #[tokio::test]
    async fn test_delete_with_children_is_conflict() {
        let app = create_test_app();
        send(
            app.clone(),
            "POST",
            "/top/realms?_action=create",
            Some(CALLER),
            Some(json!({ "realm": "leaf" })),
        )
        .await;

        let (status, _) = send(app.clone(), "DELETE", "/realms/top", Some(CALLER), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) =
            send(app, "DELETE", "/top/realms/leaf", Some(CALLER), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": "true" }));
    }

    #[tokio::test]
    async fn test_unsupported_operations_return_501() {
        let app = create_test_app();

        let (status, body) = send(
            app.clone(),
            "POST",
            "/realms?_action=reload",
            Some(CALLER),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(
            body["message"],
            "Actions are not supported for resource instances"
        );

        let (status, _) = send(
            app.clone(),
            "POST",
            "/realms/top?_action=reload",
            Some(CALLER),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

        let (status, _) = send(app, "PATCH", "/realms/top", Some(CALLER), Some(json!([]))).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_unknown_resource_is_not_found() {
        let (status, _) = send(create_test_app(), "GET", "/users/bob", Some(CALLER), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
