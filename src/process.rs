//! 进程管理
//!
//! PID 文件与运行用户/用户组切换

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Process management utilities
pub struct ProcessManager;

impl ProcessManager {
    /// 写入 PID 文件，未配置路径时返回 None
    pub fn write_pid_file(pid_path: Option<&str>) -> Result<Option<PathBuf>> {
        let Some(path_str) = pid_path else {
            return Ok(None);
        };
        let path = Path::new(path_str);

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create PID file directory: {parent:?}"))?;
        }

        if let Some(previous) = Self::read_pid_file(path) {
            warn!("Overwriting existing PID file {:?} (previous PID: {})", path, previous);
        }

        let pid = std::process::id();
        fs::write(path, format!("{pid}\n"))
            .with_context(|| format!("Failed to write PID file: {path:?}"))?;

        info!("PID file written: {:?} (PID: {})", path, pid);
        Ok(Some(path.to_path_buf()))
    }

    /// 读取 PID 文件中的进程号
    pub fn read_pid_file(path: &Path) -> Option<u32> {
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    /// 删除 PID 文件
    pub fn remove_pid_file(pid_path: Option<&PathBuf>) {
        let Some(path) = pid_path else {
            return;
        };
        match fs::remove_file(path) {
            Ok(()) => info!("PID file removed: {:?}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove PID file {:?}: {}", path, e),
        }
    }

    /// 切换到配置的用户/用户组（仅 root 可用）
    #[cfg(unix)]
    pub fn drop_privileges(user: Option<&str>, group: Option<&str>) -> Result<()> {
        use nix::unistd::{Gid, Group, Uid, User, setgid, setuid};

        if user.is_none() && group.is_none() {
            return Ok(());
        }

        if !Uid::current().is_root() {
            warn!("Not running as root, cannot switch user/group");
            return Ok(());
        }

        // 先切换组，切换用户后将失去权限
        let target_gid: Option<(String, Gid)> = match (group, user) {
            (Some(group_name), _) => {
                let group_info = Group::from_name(group_name)?
                    .ok_or_else(|| anyhow::anyhow!("Group '{group_name}' not found"))?;
                Some((group_name.to_string(), group_info.gid))
            }
            (None, Some(user_name)) => {
                let user_info = User::from_name(user_name)?
                    .ok_or_else(|| anyhow::anyhow!("User '{user_name}' not found"))?;
                Some((format!("{user_name} (primary)"), user_info.gid))
            }
            (None, None) => None,
        };

        if let Some((label, gid)) = target_gid {
            clear_supplementary_groups()?;
            setgid(gid).with_context(|| format!("Failed to set group ID to {label}"))?;
            info!("Switched to group: {} (GID: {})", label, gid);
        }

        if let Some(user_name) = user {
            let user_info = User::from_name(user_name)?
                .ok_or_else(|| anyhow::anyhow!("User '{user_name}' not found"))?;
            setuid(user_info.uid)
                .with_context(|| format!("Failed to set user ID to {user_name}"))?;
            info!("Switched to user: {} (UID: {})", user_name, user_info.uid);
        }

        Ok(())
    }

    #[cfg(not(unix))]
    pub fn drop_privileges(user: Option<&str>, group: Option<&str>) -> Result<()> {
        if user.is_some() || group.is_some() {
            warn!("User/group switching is not supported on this platform");
        }
        Ok(())
    }
}

#[cfg(all(
    unix,
    not(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "tvos",
        target_os = "watchos",
        target_os = "redox",
        target_os = "haiku"
    ))
))]
fn clear_supplementary_groups() -> Result<()> {
    nix::unistd::setgroups(&[]).context("Failed to clear supplementary groups")
}

#[cfg(all(
    unix,
    any(
        target_os = "macos",
        target_os = "ios",
        target_os = "tvos",
        target_os = "watchos",
        target_os = "redox",
        target_os = "haiku"
    )
))]
fn clear_supplementary_groups() -> Result<()> {
    Ok(())
}

/// 退出时删除 PID 文件
pub struct PidFileGuard {
    path: Option<PathBuf>,
}

impl PidFileGuard {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        ProcessManager::remove_pid_file(self.path.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_file_lifecycle() {
        let temp = tempfile::tempdir().unwrap();
        let pid_path = temp.path().join("run").join("realmd.pid");

        let written = ProcessManager::write_pid_file(pid_path.to_str()).unwrap();
        assert_eq!(written.as_deref(), Some(pid_path.as_path()));
        assert_eq!(
            ProcessManager::read_pid_file(&pid_path),
            Some(std::process::id())
        );

        {
            let guard = PidFileGuard::new(written);
            assert_eq!(guard.path(), Some(pid_path.as_path()));
        }
        assert!(!pid_path.exists());
    }

    #[test]
    fn test_no_pid_path_is_noop() {
        assert!(ProcessManager::write_pid_file(None).unwrap().is_none());
        ProcessManager::remove_pid_file(None);
    }

    #[test]
    fn test_drop_privileges_without_target_is_noop() {
        assert!(ProcessManager::drop_privileges(None, None).is_ok());
    }
}
