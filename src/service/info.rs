//! 服务信息管理模块

use serde::{Deserialize, Serialize};
use strum::Display;
use url::Url;

use super::ServiceType;

/// 服务运行状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq, Default)]
pub enum ServiceStatus {
    #[default]
    Unknown,
    Running,
    Stopped,
}

/// 服务基本信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// 服务名称
    pub name: String,
    pub service_type: ServiceType,
    /// 对外访问地址（启动后设置）
    pub base_url: Option<Url>,
    /// 服务状态
    pub status: ServiceStatus,
    /// 服务描述
    pub description: Option<String>,
}

impl ServiceInfo {
    pub fn new(
        name: impl Into<String>,
        service_type: ServiceType,
        description: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            service_type,
            base_url: None,
            status: ServiceStatus::Unknown,
            description,
        }
    }

    /// 标记为运行中并记录访问地址
    pub fn set_running(&mut self, base_url: Url) {
        self.base_url = Some(base_url);
        self.status = ServiceStatus::Running;
    }

    pub fn set_stopped(&mut self) {
        self.status = ServiceStatus::Stopped;
    }

    pub fn is_running(&self) -> bool {
        self.status == ServiceStatus::Running
    }
}
