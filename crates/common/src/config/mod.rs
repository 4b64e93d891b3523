//! 统一配置管理系统
//!
//! 本模块是 realmd 配置的"单一真理之源"。
//! 所有配置项的定义、文档、默认值都在这里统一管理。

pub mod admin;
pub mod api;
pub mod bind;
pub mod directory;
pub mod tracing;

pub use crate::config::admin::AdminConfig;
pub use crate::config::api::ApiConfig;
pub use crate::config::bind::BindConfig;
pub use crate::config::directory::DirectoryConfig;
pub use crate::config::tracing::TracingConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// realmd 主配置结构体
///
/// 配置文件使用 TOML 格式，支持完整的类型安全加载。
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RealmdConfig {
    /// 服务器实例名称
    ///
    /// 用于标识不同的服务器实例，在集群部署中用于区分节点。
    pub name: String,

    /// 运行环境标识
    ///
    /// - "dev": 开发环境，允许 HTTP
    /// - "prod": 生产环境，强制 HTTPS，严格的安全检查
    /// - "test": 测试环境，用于自动化测试
    pub env: String,

    /// 运行用户（可选）
    ///
    /// 服务会在绑定端口后切换到此用户运行。留空则保持当前用户。
    pub user: Option<String>,

    /// 运行用户组（可选）
    pub group: Option<String>,

    /// PID 文件路径（可选）
    pub pid: Option<String>,

    /// 网络绑定配置
    pub bind: BindConfig,

    /// REST 接口配置
    #[serde(default)]
    pub api: ApiConfig,

    /// 管理员凭证配置
    pub admin: AdminConfig,

    /// 内存组织目录配置
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// 可观测性配置（日志 + 追踪）
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// 可观测性配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ObservabilityConfig {
    /// 过滤级别（用于日志与追踪）
    ///
    /// 支持 EnvFilter 语法（如 "info,hyper=warn"）。默认值 "info"。
    #[serde(default = "default_filter_level")]
    pub filter_level: String,

    #[serde(default)]
    pub log: LogConfig,

    /// OpenTelemetry 追踪配置（可选）
    ///
    /// 需要编译时启用 `opentelemetry` feature。
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// 日志配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// 日志输出目标："console"（默认）或 "file"
    #[serde(default = "default_log_output")]
    pub output: String,

    /// 按天轮转日志文件（仅 output = "file" 时有效）
    #[serde(default)]
    pub rotate: bool,

    /// 日志文件目录（仅 output = "file" 时有效）
    #[serde(default = "default_log_path")]
    pub path: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            filter_level: default_filter_level(),
            tracing: TracingConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: default_log_output(),
            rotate: false,
            path: default_log_path(),
        }
    }
}

fn default_log_output() -> String {
    "console".to_string()
}

fn default_log_path() -> String {
    "logs/".to_string()
}

fn default_filter_level() -> String {
    "info".to_string()
}

const DEFAULT_PID_PATH: &str = "logs/realmd.pid";

impl Default for RealmdConfig {
    fn default() -> Self {
        Self {
            name: "realmd-default".to_string(),
            env: "dev".to_string(),
            user: None,
            group: None,
            pid: Some(DEFAULT_PID_PATH.to_string()),
            bind: BindConfig::default(),
            api: ApiConfig::default(),
            admin: AdminConfig::default(),
            directory: DirectoryConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl RealmdConfig {
    /// 获取 PID 文件路径，如果没有配置则使用默认值
    pub fn get_pid_path(&self) -> Option<String> {
        self.pid
            .clone()
            .or_else(|| Some(DEFAULT_PID_PATH.to_string()))
    }

    /// 获取追踪配置
    pub fn tracing_config(&self) -> &TracingConfig {
        &self.observability.tracing
    }

    /// 返回日志配置引用
    pub fn log_config(&self) -> &LogConfig {
        &self.observability.log
    }

    /// 检查是否使用控制台日志输出
    pub fn is_console_logging(&self) -> bool {
        self.observability.log.output == "console"
    }

    /// 检查是否应该轮转日志
    pub fn should_rotate_logs(&self) -> bool {
        self.observability.log.output == "file" && self.observability.log.rotate
    }

    /// 获取日志/追踪过滤级别，优先使用 RUST_LOG
    pub fn get_filter_level(&self) -> String {
        std::env::var("RUST_LOG")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.observability.filter_level.clone())
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ConfigError::FileNotFound {
                path: path_ref.display().to_string(),
            });
        }

        if !path_ref.is_file() {
            return Err(ConfigError::InvalidFormat {
                message: format!("Path is not a valid file: {}", path_ref.display()),
            });
        }

        let content = std::fs::read_to_string(path_ref)?;
        Ok(Self::from_toml(&content)?)
    }

    /// 从 TOML 字符串加载配置
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 将配置序列化为 TOML 字符串
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// 验证配置有效性
    ///
    /// 返回全部问题；以 "Warning:" 开头的条目不阻止启动。
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Instance name cannot be empty".to_string());
        }

        if !["dev", "prod", "test"].contains(&self.env.as_str()) {
            errors.push(format!(
                "Invalid environment '{}', must be one of: dev, prod, test",
                self.env
            ));
        }

        // 验证过滤级别（EnvFilter 语法）
        {
            let main_level = self
                .observability
                .filter_level
                .split(',')
                .next()
                .unwrap_or("")
                .trim();
            if !["trace", "debug", "info", "warn", "error"].contains(&main_level) {
                errors.push(format!(
                    "Invalid filter level '{}', must start with one of: trace, debug, info, warn, error",
                    self.observability.filter_level
                ));
            }
        }

        if !["console", "file"].contains(&self.observability.log.output.as_str()) {
            errors.push(format!(
                "Invalid log output '{}' (observability.log.output), must be 'console' or 'file'",
                self.observability.log.output
            ));
        }

        errors.extend(self.bind.validate());

        if let Err(e) = self.api.validate() {
            errors.push(format!("API configuration error: {e}"));
        }

        errors.extend(self.admin.validate());

        if let Err(e) = self.directory.validate() {
            errors.push(format!("Directory configuration error: {e}"));
        }

        if let Err(e) = self.observability.tracing.validate() {
            errors.push(format!("Tracing configuration error: {e}"));
        }

        // 生产环境额外检查
        if self.env == "prod" {
            match self.bind.https {
                Some(ref https) if https.port == 0 => errors.push(
                    "Production environment should enable HTTPS with valid port".to_string(),
                ),
                Some(_) => {}
                None => errors.push("Production environment should enable HTTPS".to_string()),
            }

            if self.observability.log.output == "console" {
                errors.push("Warning: Production environment should use file logging (observability.log.output = \"file\")".to_string());
            }

            if self.observability.log.output == "file" && !self.observability.log.rotate {
                errors.push("Warning: Production environment should enable log rotation (observability.log.rotate = true)".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// 判断校验条目是否仅为警告
pub fn is_warning(entry: &str) -> bool {
    entry.starts_with("Warning:")
}
