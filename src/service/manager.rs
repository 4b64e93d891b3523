//! 服务管理器模块 - 负责合并 HTTP 路由服务并管理监听生命周期

use super::HttpRouterService;
use super::info::ServiceInfo;
use crate::service::trace::http_trace_layer;
use anyhow::Result;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use realmd_common::{TlsConfigurer, config::RealmdConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use url::Url;

/// 监听计划：绑定地址、对外地址以及可选的 TLS 证书路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerPlan {
    pub addr: SocketAddr,
    pub public_url: Url,
    pub tls: Option<(String, String)>,
}

impl ListenerPlan {
    pub fn protocol(&self) -> &'static str {
        if self.tls.is_some() { "HTTPS" } else { "HTTP" }
    }

    /// 按环境选择监听：dev 优先 HTTP，其余环境必须 HTTPS
    pub fn from_config(config: &RealmdConfig) -> Result<Self> {
        let is_dev = config.env.eq_ignore_ascii_case("dev");

        if is_dev && let Some(ref http) = config.bind.http {
            return Ok(Self {
                addr: parse_addr(&http.bind_addr())?,
                public_url: parse_url("http", &http.domain_name, http.port)?,
                tls: None,
            });
        }

        match config.bind.https {
            Some(ref https) => Ok(Self {
                addr: parse_addr(&https.bind_addr())?,
                public_url: parse_url("https", &https.domain_name, https.port)?,
                tls: Some((https.cert.clone(), https.key.clone())),
            }),
            None if is_dev => Err(anyhow::anyhow!(
                "No HTTP or HTTPS binding configuration found"
            )),
            None => Err(anyhow::anyhow!(
                "HTTPS binding configuration is required for {} environment",
                config.env
            )),
        }
    }
}

fn parse_addr(bind_addr: &str) -> Result<SocketAddr> {
    bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address '{bind_addr}': {e}"))
}

fn parse_url(scheme: &str, domain: &str, port: u16) -> Result<Url> {
    Url::parse(&format!("{scheme}://{domain}:{port}"))
        .map_err(|e| anyhow::anyhow!("Failed to parse {scheme} URL: {e}"))
}

/// 服务管理器，负责管理多个服务的生命周期
#[derive(Debug)]
pub struct ServiceManager {
    services: Vec<Box<dyn HttpRouterService>>,
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
    config: RealmdConfig,
}

impl ServiceManager {
    /// 创建新的服务管理器
    pub fn new(config: RealmdConfig, shutdown_tx: tokio::sync::broadcast::Sender<()>) -> Self {
        Self {
            services: Vec::new(),
            shutdown_tx,
            config,
        }
    }

    /// 添加服务到管理器
    pub fn add_service(&mut self, service: Box<dyn HttpRouterService>) {
        info!("Adding service '{}' to manager", service.info().name);
        self.services.push(service);
    }

    /// 当前服务信息快照
    pub fn service_infos(&self) -> Vec<ServiceInfo> {
        self.services.iter().map(|s| s.info().clone()).collect()
    }

    /// 构建合并后的路由器（服务路由 + /metrics + 全局中间件）
    pub async fn build_app(&mut self, public_url: &Url) -> Result<Router> {
        let mut app = Router::new();

        for service in &mut self.services {
            let route_prefix = service.route_prefix().to_string();
            let service_name = service.info().name.clone();

            let router = service.build_router().await.map_err(|e| {
                error!("Failed to build router for service '{}': {:?}", service_name, e);
                e
            })?;

            info!("Adding route '{}' for service '{}'", route_prefix, service_name);
            // axum 不允许 nest 到根路径
            app = if route_prefix == "/" {
                app.merge(router)
            } else {
                app.nest(&route_prefix, router)
            };

            let service_url = public_url
                .join(&route_prefix)
                .unwrap_or_else(|_| public_url.clone());
            if let Err(e) = service.on_start(service_url).await {
                error!("Failed to start service '{}': {:?}", service_name, e);
            }
        }

        info!("Adding /metrics endpoint for Prometheus");
        app = app.route("/metrics", axum::routing::get(metrics_handler));

        Ok(app
            .layer(http_trace_layer())
            .layer(CorsLayer::permissive()))
    }

    /// 启动所有服务
    pub async fn start_all(&mut self) -> Result<Vec<JoinHandle<()>>> {
        let plan = ListenerPlan::from_config(&self.config)?;

        info!(
            "Starting {} server with {} route services (environment: {})",
            plan.protocol(),
            self.services.len(),
            self.config.env
        );

        let tls_config = match plan.tls {
            Some((ref cert, ref key)) => {
                TlsConfigurer::install_crypto_provider();
                let server_config = TlsConfigurer::create_tls_config(cert, key)?;
                Some(RustlsConfig::from_config(Arc::new(server_config)))
            }
            None => None,
        };

        let app = self.build_app(&plan.public_url).await?;
        let handle = self.spawn_server(plan.addr, app, tls_config).await?;
        Ok(vec![handle])
    }

    async fn spawn_server(
        &self,
        addr: SocketAddr,
        app: Router,
        tls_config: Option<RustlsConfig>,
    ) -> Result<JoinHandle<()>> {
        let shutdown_tx = self.shutdown_tx.clone();
        // 在 spawn 前订阅关闭信号
        let mut shutdown_rx = shutdown_tx.subscribe();

        let handle = if let Some(tls_config) = tls_config {
            info!("HTTPS server listening on {}", addr);
            let server = axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>());
            tokio::spawn(async move {
                tokio::select! {
                    result = server => {
                        if let Err(e) = result {
                            error!("HTTPS server error: {}", e);
                            let _ = shutdown_tx.send(());
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("HTTPS server received shutdown signal");
                    }
                }
                info!("HTTPS server stopped");
            })
        } else {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to bind to address '{addr}': {e}"))?;
            info!("HTTP server listening on {}", listener.local_addr()?);

            tokio::spawn(async move {
                let server = axum::serve(
                    listener,
                    app.into_make_service_with_connect_info::<SocketAddr>(),
                )
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                    info!("HTTP server received shutdown signal");
                });
                if let Err(e) = server.await {
                    error!("HTTP server error: {}", e);
                    let _ = shutdown_tx.send(());
                }
                info!("HTTP server stopped");
            })
        };

        Ok(handle)
    }

    /// Stop all services
    pub async fn stop_all(&mut self) -> Result<()> {
        info!("Stopping all services");

        let _ = self.shutdown_tx.send(());
        for service in &mut self.services {
            if let Err(e) = service.on_stop().await {
                error!("Failed to stop service '{}': {:?}", service.info().name, e);
            }
        }

        info!("All services stopped");
        Ok(())
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> String {
    realmd_common::metrics::export_metrics()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::RealmsHttpService;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use realmd_common::config::bind::BindConfig;
    use tower::ServiceExt;

    const CALLER: &str = "manager-caller-token-0123456789";

    fn test_config(route_prefix: &str) -> RealmdConfig {
        let mut config = RealmdConfig::default();
        config.bind = BindConfig::http_only("127.0.0.1", 0);
        config.api.route_prefix = route_prefix.to_string();
        config.admin.admin_token = "manager-directory-token-0123".to_string();
        config.admin.super_admin_tokens = vec![CALLER.to_string()];
        config.directory.seed_realms = vec!["/top".to_string()];
        config
    }

    async fn build_test_app(route_prefix: &str) -> (Router, ServiceManager) {
        let config = test_config(route_prefix);
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
        let mut manager = ServiceManager::new(config.clone(), shutdown_tx);
        manager.add_service(Box::new(RealmsHttpService::new(config)));

        let url = Url::parse("http://localhost:8080").unwrap();
        let app = manager.build_app(&url).await.unwrap();
        (app, manager)
    }

    #[test]
    fn test_listener_plan_dev_prefers_http() {
        let plan = ListenerPlan::from_config(&test_config("/json")).unwrap();
        assert_eq!(plan.protocol(), "HTTP");
        assert_eq!(plan.addr.to_string(), "127.0.0.1:0");
    }

    #[test]
    fn test_listener_plan_prod_requires_https() {
        let mut config = test_config("/json");
        config.env = "prod".to_string();
        assert!(ListenerPlan::from_config(&config).is_err());

        config.bind = BindConfig::default();
        let plan = ListenerPlan::from_config(&config).unwrap();
        assert_eq!(plan.protocol(), "HTTPS");
        assert_eq!(plan.public_url.scheme(), "https");
    }

    #[tokio::test]
    async fn test_realms_mounted_under_prefix() {
        let (app, manager) = build_test_app("/json").await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/json/realms/top")
                    .header("iPlanetDirectoryPro", CALLER)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let infos = manager.service_infos();
        assert_eq!(infos.len(), 1);
        assert!(infos[0].is_running());
        assert_eq!(
            infos[0].base_url.as_ref().map(Url::as_str),
            Some("http://localhost:8080/json")
        );
    }

    #[tokio::test]
    async fn test_root_prefix_merges_router() {
        let (app, _) = build_test_app("/").await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/realms")
                    .header("iPlanetDirectoryPro", CALLER)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stop_all_marks_services_stopped() {
        let (_, mut manager) = build_test_app("/json").await;
        manager.stop_all().await.unwrap();
        assert!(manager.service_infos().iter().all(|i| !i.is_running()));
    }
}
