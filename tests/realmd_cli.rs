use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn write_config(dir: &Path, file_name: &str, body: &str) -> PathBuf {
    let config_path = dir.join(file_name);
    fs::write(&config_path, body).expect("write config");
    config_path
}

fn write_valid_config(dir: &Path, file_name: &str) -> PathBuf {
    write_config(
        dir,
        file_name,
        &format!(
            r#"
name = "realmd-cli-test"
env = "dev"
pid = "{pid}"

[bind.http]
domain_name = "localhost"
advertised_ip = "127.0.0.1"
ip = "127.0.0.1"
port = 39999

[admin]
admin_token = "cli-directory-admin-token-0123"
super_admin_tokens = ["cli-caller-token-0123456789"]

[directory]
services = ["iPlanetAMAuthService"]

[observability.log]
output = "console"
"#,
            pid = dir.join("realmd.pid").display()
        ),
    )
}

fn write_warning_only_config(dir: &Path, file_name: &str) -> PathBuf {
    write_config(
        dir,
        file_name,
        &format!(
            r#"
name = "realmd-cli-warning-test"
env = "prod"
pid = "{pid}"

[bind.https]
domain_name = "localhost"
advertised_ip = "127.0.0.1"
ip = "127.0.0.1"
port = 44443
cert = "/tmp/fake.crt"
key = "/tmp/fake.key"

[admin]
admin_token = "short"

[observability.log]
output = "console"
"#,
            pid = dir.join("realmd.pid").display()
        ),
    )
}

fn write_validation_error_config(dir: &Path, file_name: &str) -> PathBuf {
    write_config(
        dir,
        file_name,
        r#"
name = "realmd-cli-validation-error-test"
env = "dev"

[bind.http]
domain_name = "localhost"
advertised_ip = "127.0.0.1"
ip = "127.0.0.1"
port = 39997

# Intentionally empty to trigger the admin token validation error.
[admin]
admin_token = ""

[api]
route_prefix = "json"
"#,
    )
}

fn run_realmd(args: &[&str], current_dir: Option<&Path>) -> Output {
    let mut cmd = Command::new(PathBuf::from(env!("CARGO_BIN_EXE_realmd")));
    cmd.args(args);
    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }
    cmd.output().expect("run realmd command")
}

#[test]
fn realmd_test_command_accepts_explicit_valid_config() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_valid_config(temp.path(), "valid.toml");
    let output = run_realmd(&["test", config_path.to_str().expect("utf8 path")], None);

    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn realmd_test_command_finds_default_config_in_current_directory() {
    let temp = tempfile::tempdir().expect("temp dir");
    write_valid_config(temp.path(), "config.toml");
    let output = run_realmd(&["test"], Some(temp.path()));

    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn realmd_test_command_fails_for_missing_custom_config_path() {
    let temp = tempfile::tempdir().expect("temp dir");
    let missing_path = temp.path().join("missing.toml");
    let output = run_realmd(&["test", missing_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(
        stderr.contains("Config file not found"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn realmd_test_command_fails_for_invalid_config_content() {
    let temp = tempfile::tempdir().expect("temp dir");
    let bad_path = temp.path().join("bad.toml");
    fs::write(&bad_path, "name = \"broken\"\nenv = [\n").expect("write invalid toml");

    let output = run_realmd(&["test", bad_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(stderr.contains("配置解析失败"), "unexpected stderr: {stderr}");
}

#[test]
fn realmd_test_command_fails_for_validation_errors() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_validation_error_config(temp.path(), "validation-error.toml");
    let output = run_realmd(&["test", config_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(
        stderr.contains("admin.admin_token") && stderr.contains("route_prefix"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn realmd_test_command_succeeds_with_warning_only_config() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_warning_only_config(temp.path(), "warning.toml");
    let output = run_realmd(&["test", config_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "warning-only config should succeed, stderr: {stderr}"
    );
    assert!(stderr.contains("Warning:"), "unexpected stderr: {stderr}");
}

#[test]
fn realmd_run_mode_fails_when_no_default_config_exists() {
    let temp = tempfile::tempdir().expect("temp dir");
    let output = run_realmd(&[], Some(temp.path()));
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "run mode should fail");
    assert!(
        stderr.contains("No configuration file found"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn realmd_run_mode_fails_for_validation_errors() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_validation_error_config(temp.path(), "run-validation-error.toml");
    let output = run_realmd(
        &["--config", config_path.to_str().expect("utf8 path")],
        None,
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "run mode should fail");
    assert!(stderr.contains("配置验证失败"), "unexpected stderr: {stderr}");
}
