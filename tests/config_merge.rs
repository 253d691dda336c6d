use std::sync::Mutex;

use serde_yaml::Value;
use tempfile::TempDir;
use uta_lib::config::{deep_merge, Config};

// Config::load consults UI_AUTOMATION_ENV; tests that touch the loader
// serialize on this lock so the env-var test cannot race them.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn yaml(text: &str) -> Value {
    serde_yaml::from_str(text).expect("valid yaml")
}

#[test]
fn empty_overlay_is_identity() {
    let base = yaml("app:\n  base_url: http://base\ntimeout:\n  short: 3000");
    let merged = deep_merge(base.clone(), yaml("{}"));
    assert_eq!(merged, base);
}

#[test]
fn colliding_leaf_takes_overlay_value_and_rest_survives() {
    let base = yaml(
        "app:\n  base_url: http://base\n  login_path: /login\nbrowser:\n  headless: true",
    );
    let overlay = yaml("app:\n  base_url: http://overlay\nreport:\n  log_dir: logs");
    let merged = deep_merge(base, overlay);

    assert_eq!(merged["app"]["base_url"], Value::from("http://overlay"));
    assert_eq!(merged["app"]["login_path"], Value::from("/login"));
    assert_eq!(merged["browser"]["headless"], Value::from(true));
    assert_eq!(merged["report"]["log_dir"], Value::from("logs"));
}

#[test]
fn merge_is_recursive_not_wholesale() {
    let base = yaml("timeout:\n  short: 3000\n  medium: 5000\n  long: 10000");
    let overlay = yaml("timeout:\n  long: 20000");
    let merged = deep_merge(base, overlay);

    assert_eq!(merged["timeout"]["short"], Value::from(3000));
    assert_eq!(merged["timeout"]["long"], Value::from(20000));
}

#[test]
fn load_applies_overlay_file_for_named_environment() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("config.yaml"),
        "env: test\napp:\n  base_url: http://base\n  login_path: /login\ntimeout:\n  medium: 5000\n",
    )
    .expect("write base");
    std::fs::write(
        dir.path().join("config_test.yaml"),
        "app:\n  base_url: http://test-env\ntimeout:\n  medium: 8000\n",
    )
    .expect("write overlay");

    let config = Config::load(dir.path()).expect("load");
    assert_eq!(config.app.base_url, "http://test-env");
    assert_eq!(config.app.login_path, "/login");
    assert_eq!(config.timeout.medium, 8000);
    assert_eq!(config.timeout.short, 3000, "defaults fill unset fields");
}

#[test]
fn load_without_overlay_uses_base_only() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("config.yaml"),
        "env: default\napp:\n  base_url: http://base\n",
    )
    .expect("write base");

    let config = Config::load(dir.path()).expect("load");
    assert_eq!(config.app.base_url, "http://base");
    assert_eq!(config.browser.slow_mo, 0);
    assert!(config.browser.headless);
}

#[test]
fn load_rejects_missing_base_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().expect("tempdir");
    let err = Config::load(dir.path()).expect_err("should fail");
    assert!(format!("{err}").contains("config file not found"));
}

#[test]
fn env_var_selects_overlay_environment() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("config.yaml"),
        "env: default\napp:\n  base_url: http://base\n",
    )
    .expect("write base");
    std::fs::write(
        dir.path().join("config_ci.yaml"),
        "app:\n  base_url: http://ci\n",
    )
    .expect("write overlay");

    std::env::set_var("UI_AUTOMATION_ENV", "ci");
    let config = Config::load(dir.path()).expect("load");
    std::env::remove_var("UI_AUTOMATION_ENV");

    assert_eq!(config.env, "ci");
    assert_eq!(config.app.base_url, "http://ci");
}
