//! Realm HTTP 服务实现
//!
//! 将 realms 集合资源路由挂载到配置的 API 前缀下

use crate::service::ServiceType;
use crate::service::{HttpRouterService, info::ServiceInfo};
use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use realmd_common::config::RealmdConfig;
use realms::{create_realms_state, create_router};
use tracing::info;

/// Realm HTTP 服务实现
#[derive(Debug)]
pub struct RealmsHttpService {
    info: ServiceInfo,
    config: RealmdConfig,
}

impl RealmsHttpService {
    pub fn new(config: RealmdConfig) -> Self {
        Self {
            info: ServiceInfo::new(
                "Realms Service",
                ServiceType::Realms,
                Some("Realm 资源服务 - 层级 realm 的增删改查".to_string()),
            ),
            config,
        }
    }
}

#[async_trait]
impl HttpRouterService for RealmsHttpService {
    fn info(&self) -> &ServiceInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ServiceInfo {
        &mut self.info
    }

    async fn build_router(&mut self) -> Result<Router> {
        info!("Building realms router");

        let state = create_realms_state(&self.config)
            .map_err(|e| anyhow::anyhow!("Failed to create realms state: {e}"))?;
        let router = create_router(state);

        info!("Realms router built successfully");
        Ok(router)
    }

    fn route_prefix(&self) -> &str {
        &self.config.api.route_prefix
    }
}
