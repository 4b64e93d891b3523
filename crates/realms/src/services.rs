//! 服务分配对齐
//!
//! 将 realm 当前已分配的服务对齐到请求中期望的服务列表。

use crate::directory::{DirectoryResult, OrganizationHandle};
use std::collections::BTreeSet;
use tracing::debug;

/// 服务变更计划
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicePlan {
    pub assign: Vec<String>,
    pub unassign: Vec<String>,
}

impl ServicePlan {
    pub fn is_empty(&self) -> bool {
        self.assign.is_empty() && self.unassign.is_empty()
    }
}

/// 计算服务变更
///
/// 遍历期望与当前的并集：两边都有则不变，只在期望中则分配，只在当前中则取消分配。
/// 期望列表为空时返回空计划（不会取消所有服务）。
pub fn plan_service_changes<S: AsRef<str>>(desired: &[S], current: &BTreeSet<String>) -> ServicePlan {
    if desired.is_empty() {
        return ServicePlan::default();
    }

    let desired: BTreeSet<&str> = desired.iter().map(|s| s.as_ref()).collect();
    let current: BTreeSet<&str> = current.iter().map(String::as_str).collect();

    ServicePlan {
        assign: desired
            .difference(&current)
            .map(|s| s.to_string())
            .collect(),
        unassign: current
            .difference(&desired)
            .map(|s| s.to_string())
            .collect(),
    }
}

/// 在 realm 上执行服务对齐，返回实际执行的计划
pub async fn reconcile_services(
    handle: &dyn OrganizationHandle,
    desired: &[String],
) -> DirectoryResult<ServicePlan> {
    if desired.is_empty() {
        return Ok(ServicePlan::default());
    }

    let current = handle.get_assigned_services().await?;
    let plan = plan_service_changes(desired, &current);

    for service in &plan.assign {
        debug!("Assigning service {} to {}", service, handle.realm());
        handle.assign_service(service).await?;
    }
    for service in &plan.unassign {
        debug!("Unassigning service {} from {}", service, handle.realm());
        handle.unassign_service(service).await?;
    }

    Ok(plan)
}
