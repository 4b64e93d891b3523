//! # Service Management Abstraction
//!
//! 管理 HTTP 路由服务的生命周期
//!
//! ## 核心概念
//!
//! - `HttpRouterService`: HTTP 路由服务的核心 trait，提供 axum 路由器
//! - `ServiceInfo`: 服务的基本信息
//! - `ServiceManager`: 服务管理器，负责合并路由并启动 HTTP/HTTPS 监听

pub mod info;
pub mod manager;
pub mod realms;
pub mod trace;

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use info::ServiceInfo;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use strum::Display;
use tracing::info;
use url::Url;

pub use info::ServiceStatus;
pub use manager::ServiceManager;
pub use realms::RealmsHttpService;

/// 服务类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
pub enum ServiceType {
    Realms,
}

/// HTTP路由服务的核心 trait - 为 axum 提供路由器
#[async_trait]
pub trait HttpRouterService: Send + Sync + Debug {
    /// 获取服务信息
    fn info(&self) -> &ServiceInfo;

    /// 获取可变的服务信息
    fn info_mut(&mut self) -> &mut ServiceInfo;

    /// 构建axum路由器
    async fn build_router(&mut self) -> Result<Router>;

    /// 服务启动回调（路由器已构建并启动后调用）
    async fn on_start(&mut self, base_url: Url) -> Result<()> {
        self.info_mut().set_running(base_url);
        Ok(())
    }

    /// 服务停止回调
    async fn on_stop(&mut self) -> Result<()> {
        info!("HTTP router service '{}' stopped", self.info().name);
        self.info_mut().set_stopped();
        Ok(())
    }

    /// 获取路由前缀（如 "/json"）
    fn route_prefix(&self) -> &str;
}
