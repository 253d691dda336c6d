use std::process::Command;
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) {
    std::fs::write(dir.path().join("config.yaml"), contents).expect("write config");
}

const VALID_CONFIG: &str = "\
env: default
app:
  base_url: \"http://app.example.com\"
  login_path: \"/login\"
";

#[test]
fn check_config_passes_for_valid_config() {
    let dir = TempDir::new().expect("tempdir");
    write_config(&dir, VALID_CONFIG);

    let output = Command::new(env!("CARGO_BIN_EXE_uta"))
        .args(["--config-dir", dir.path().to_str().unwrap(), "check-config"])
        .output()
        .expect("run uta");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Effective config"));
    assert!(stdout.contains("http://app.example.com"));
}

#[test]
fn check_config_fails_fatally_for_missing_config() {
    let dir = TempDir::new().expect("tempdir");

    let output = Command::new(env!("CARGO_BIN_EXE_uta"))
        .args(["--config-dir", dir.path().to_str().unwrap(), "check-config"])
        .output()
        .expect("run uta");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config file not found"));
    assert!(stderr.contains("hint:"), "fatal errors carry a remediation hint");
}

#[test]
fn check_config_fails_fatally_for_invalid_config() {
    let dir = TempDir::new().expect("tempdir");
    write_config(
        &dir,
        "env: default\napp:\n  base_url: \"not-a-url\"\ntimeout:\n  short: 9000\n  medium: 5000\n  long: 10000\n",
    );

    let output = Command::new(env!("CARGO_BIN_EXE_uta"))
        .args(["--config-dir", dir.path().to_str().unwrap(), "check-config"])
        .output()
        .expect("run uta");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("http(s)"));
    assert!(stderr.contains("ordered"), "all validation problems are aggregated");
}

#[test]
fn check_config_verbose_reports_missing_default_account() {
    let dir = TempDir::new().expect("tempdir");
    write_config(&dir, VALID_CONFIG);

    let output = Command::new(env!("CARGO_BIN_EXE_uta"))
        .args([
            "--config-dir",
            dir.path().to_str().unwrap(),
            "--verbose",
            "check-config",
        ])
        .env_remove("UI_ACCOUNT_USERNAME")
        .env_remove("UI_ACCOUNT_PASSWORD")
        .output()
        .expect("run uta");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("default account: not configured"));
}

#[test]
fn smoke_fails_fatally_when_config_is_missing() {
    let dir = TempDir::new().expect("tempdir");

    let output = Command::new(env!("CARGO_BIN_EXE_uta"))
        .args(["--config-dir", dir.path().to_str().unwrap(), "smoke"])
        .output()
        .expect("run uta");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn help_lists_all_subcommands() {
    let output = Command::new(env!("CARGO_BIN_EXE_uta"))
        .arg("--help")
        .output()
        .expect("run uta");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("smoke"));
    assert!(stdout.contains("generate-storage-state"));
    assert!(stdout.contains("check-config"));
}
