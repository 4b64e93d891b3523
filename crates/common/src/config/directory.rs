//! 内存组织目录配置

use serde::{Deserialize, Serialize};

/// 内存组织目录配置
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DirectoryConfig {
    /// 可分配的服务名
    #[serde(default)]
    pub services: Vec<String>,

    /// 强制服务：始终视为已分配，不能取消分配
    #[serde(default)]
    pub mandatory_services: Vec<String>,

    /// 启动时预置的 realm 路径（祖先自动创建）
    #[serde(default)]
    pub seed_realms: Vec<String>,
}

impl DirectoryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(empty) = self
            .services
            .iter()
            .chain(self.mandatory_services.iter())
            .find(|s| s.trim().is_empty())
        {
            return Err(format!("service names cannot be empty: {empty:?}"));
        }

        if let Some(bad) = self
            .seed_realms
            .iter()
            .find(|r| r.split('/').all(|segment| segment.trim().is_empty()))
        {
            return Err(format!("seed realm {bad:?} does not name a realm"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let mut config = DirectoryConfig {
            services: vec!["iPlanetAMAuthService".to_string()],
            mandatory_services: vec![],
            seed_realms: vec!["/top/nested".to_string()],
        };
        assert!(config.validate().is_ok());

        config.seed_realms.push("/".to_string());
        assert!(config.validate().is_err());

        config.seed_realms.pop();
        config.mandatory_services.push(" ".to_string());
        assert!(config.validate().is_err());
    }
}
