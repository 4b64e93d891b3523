//! realmd 主程序
//!
//! 加载配置、初始化可观测性，启动 Realm 资源 HTTP 服务

mod cli;
mod error;
mod observability;
mod process;

use clap::Parser;
use observability::init_observability;
use realmd::service::{RealmsHttpService, ServiceManager};
use realmd_common::config::{RealmdConfig, is_warning};
use realmd_common::error::{BaseError, ValidationError};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

macro_rules! bootstrap_info {
    ($($arg:tt)*) => {
        println!($($arg)*);
    };
}

macro_rules! bootstrap_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

use cli::{Cli, Commands};
use error::{Error, Result};

/// Application launcher utilities
struct ApplicationLauncher;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Test { config_file }) => {
            let config_path =
                ApplicationLauncher::find_config_file(config_file.as_ref().unwrap_or(&cli.config))?;
            ApplicationLauncher::test_config_file(&config_path)
        }
        None => {
            let config_path = ApplicationLauncher::find_config_file(&cli.config)?;

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            runtime.block_on(ApplicationLauncher::run_application(&config_path))
        }
    }
}

impl ApplicationLauncher {
    /// Find config file with fallback locations
    fn find_config_file(provided_path: &PathBuf) -> Result<PathBuf> {
        // 显式指定的路径必须存在
        if provided_path != Path::new("config.toml") {
            if provided_path.exists() {
                bootstrap_info!("Using provided config file: {:?}", provided_path);
                return Ok(provided_path.clone());
            }
            bootstrap_error!("Provided config file not found: {:?}", provided_path);
            return Err(Error::custom(format!(
                "Config file not found: {provided_path:?}"
            )));
        }

        let fallback_paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("/etc/realmd/config.toml"),
        ];

        bootstrap_info!("Searching for config file in default locations...");

        for path in &fallback_paths {
            if path.exists() {
                bootstrap_info!("Found config file: {:?}", path);
                return Ok(path.clone());
            }
            bootstrap_info!("Config not found at: {:?}", path);
        }

        bootstrap_error!("No configuration file found!");
        bootstrap_error!("Please create a config file in one of these locations:");
        for (i, path) in fallback_paths.iter().enumerate() {
            bootstrap_error!("  {}. {:?}", i + 1, path);
        }
        bootstrap_error!("Or specify a custom path with: realmd --config <path>");

        Err(Error::custom(
            "No configuration file found. Please create one or specify path with --config",
        ))
    }

    /// 加载并校验配置；仅含警告时继续
    fn load_config(config_path: &Path) -> Result<RealmdConfig> {
        let config = RealmdConfig::from_file(config_path).map_err(|e| {
            bootstrap_error!("❌ 配置解析失败: {}", e);
            Error::service_validation(format!("配置解析失败: {e}"))
        })?;
        bootstrap_info!("✅ 配置文件解析成功: {:?}", config_path);

        if let Err(errors) = config.validate() {
            bootstrap_error!("❌ 配置验证发现问题:");
            for (i, err) in errors.iter().enumerate() {
                if is_warning(err) {
                    bootstrap_error!("  {}. ⚠️  {}", i + 1, err);
                } else {
                    bootstrap_error!("  {}. ❌ {}", i + 1, err);
                }
            }
            let fatal: Vec<String> = errors.into_iter().filter(|e| !is_warning(e)).collect();
            if !fatal.is_empty() {
                bootstrap_error!("❌ 配置验证失败，请修复上述错误");
                return Err(BaseError::from(ValidationError::Config { errors: fatal }).into());
            }
        }

        Ok(config)
    }

    /// 测试配置文件是否有效
    fn test_config_file(config_path: &Path) -> Result<()> {
        Self::load_config(config_path)?;
        bootstrap_info!("✅ 完整配置验证通过");
        Ok(())
    }

    /// 运行应用程序的主入口
    async fn run_application(config_path: &Path) -> Result<()> {
        bootstrap_info!("📄 加载配置文件: {:?}", config_path);
        let config = Self::load_config(config_path)?;

        // 初始化可观测性系统（日志 + 追踪）
        let _observability_guard = init_observability(&config)?;

        // 写入 PID 文件（在绑定端口之前，需要权限）
        let pid_path = process::ProcessManager::write_pid_file(config.get_pid_path().as_deref())?;
        let _pid_guard = process::PidFileGuard::new(pid_path);

        Self::run_services_with_privilege_drop(config).await
    }

    /// 运行服务并在端口绑定后切换用户权限
    async fn run_services_with_privilege_drop(config: RealmdConfig) -> Result<()> {
        info!("🚀 启动 realmd ({})", config.name);

        register_metrics();

        let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(10);
        setup_shutdown_handler(shutdown_tx.clone());

        let mut service_manager = ServiceManager::new(config.clone(), shutdown_tx.clone());
        info!("📊 计划启动的服务:");
        info!("  - Realms Service ({})", config.api.route_prefix);
        service_manager.add_service(Box::new(RealmsHttpService::new(config.clone())));

        let handles = service_manager
            .start_all()
            .await
            .map_err(|e| Error::service_startup(format!("{e:#}")))?;

        info!("服务启动完成，准备切换用户权限...");
        if let Err(e) =
            process::ProcessManager::drop_privileges(config.user.as_deref(), config.group.as_deref())
        {
            error!("Failed to drop privileges: {}", e);
        }

        Self::display_service_info(&config);

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Service task terminated unexpectedly: {}", e);
                let _ = shutdown_tx.send(());
            }
        }
        service_manager.stop_all().await?;

        info!("🛑 所有服务已安全关闭");
        Ok(())
    }

    /// 显示服务信息
    fn display_service_info(config: &RealmdConfig) {
        let base_url = match (config.env.as_str(), &config.bind.http, &config.bind.https) {
            ("dev", Some(http), _) => format!("http://{}:{}", http.ip, http.port),
            (_, _, Some(https)) => format!("https://{}:{}", https.domain_name, https.port),
            _ => {
                info!("📡 没有配置 HTTP/HTTPS 服务器");
                return;
            }
        };
        let prefix = config.api.route_prefix.trim_end_matches('/');

        info!("✅ 所有服务已启动");
        info!("📡 服务器监听在: {}", base_url);
        info!("🔧 可用的API端点:");
        info!("  - {}{}/health", base_url, prefix);
        info!("  - {}{}/realms", base_url, prefix);
        info!("  - {}/metrics", base_url);
    }
}

/// 注册全局与 realm 指标
fn register_metrics() {
    let registry = &realmd_common::metrics::REGISTRY;
    if let Err(e) = realmd_common::metrics::register_metrics() {
        warn!("Prometheus metrics registration warning: {}", e);
    }
    if let Err(e) = realms::register_realm_metrics(registry) {
        warn!("Realm metrics registration warning: {}", e);
    }
    realmd_common::metrics::mark_started();
    info!("✅ Prometheus metrics registry 初始化成功");
}

/// Ctrl-C / SIGTERM 触发优雅关闭
fn setup_shutdown_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        result = tokio::signal::ctrl_c() => {
                            if let Err(e) = result {
                                error!("无法监听Ctrl-C信号: {}", e);
                                return;
                            }
                            info!("收到Ctrl-C信号，开始优雅关闭...");
                        }
                        _ = term.recv() => info!("收到SIGTERM信号，开始优雅关闭..."),
                    }
                }
                Err(e) => {
                    warn!("无法监听SIGTERM信号: {}", e);
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("无法监听Ctrl-C信号: {}", e);
                        return;
                    }
                    info!("收到Ctrl-C信号，开始优雅关闭...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("无法监听Ctrl-C信号: {}", e);
                return;
            }
            info!("收到Ctrl-C信号，开始优雅关闭...");
        }

        let _ = shutdown_tx.send(());
    });
}
