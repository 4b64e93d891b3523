//! # realmd
//!
//! Realm 资源服务：以 REST 集合资源方式管理层级 realm

pub mod service;

// Re-export commonly used types
pub use realmd_common::config::RealmdConfig;
pub use service::{RealmsHttpService, ServiceManager};
