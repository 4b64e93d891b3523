//! Realm 资源指标

use crate::error::ResourceResult;
use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts};

lazy_static! {
    /// Realm 操作计数（按操作与结果）
    pub static ref REALM_OPERATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("realm_operations_total", "Total number of realm resource operations")
            .namespace("realmd"),
        &["operation", "outcome"]
    ).unwrap();
}

/// 注册 realm 指标到 registry
pub fn register_realm_metrics(registry: &prometheus::Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(REALM_OPERATIONS.clone()))?;
    Ok(())
}

/// 记录一次操作结果
pub fn record_outcome<T>(operation: &str, result: &ResourceResult<T>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(err) => err.kind().label(),
    };
    REALM_OPERATIONS
        .with_label_values(&[operation, outcome])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;

    #[test]
    fn test_record_outcome() {
        let before = REALM_OPERATIONS
            .with_label_values(&["metrics_test", "conflict"])
            .get();

        let result: ResourceResult<()> = Err(ResourceError::conflict("exists"));
        record_outcome("metrics_test", &result);

        let after = REALM_OPERATIONS
            .with_label_values(&["metrics_test", "conflict"])
            .get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_register_twice_fails() {
        let registry = prometheus::Registry::new();
        register_realm_metrics(&registry).unwrap();
        assert!(register_realm_metrics(&registry).is_err());
    }
}
