//! Layered YAML configuration.
//!
//! `configs/config.yaml` is the base; `configs/config_<env>.yaml` is an
//! optional per-environment overlay that deep-merges over the base. The
//! result deserializes into typed structs and is validated once, so missing
//! or malformed fields surface as a single startup error instead of failing
//! at first access.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

use crate::error::{Result, UtaError};
use crate::Viewport;

/// Environment variable that overrides the `env` field of the base config.
pub const ENV_VAR_ENV: &str = "UI_AUTOMATION_ENV";
/// Environment variable overriding `account.username`.
pub const ENV_VAR_USERNAME: &str = "UI_ACCOUNT_USERNAME";
/// Environment variable overriding `account.password`.
pub const ENV_VAR_PASSWORD: &str = "UI_ACCOUNT_PASSWORD";

const BASE_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_env")]
    pub env: String,
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub timeout: TimeoutConfig,
    pub app: AppConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

fn default_env() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Browser engines reachable over CDP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Chrome,
    Edge,
}

impl BrowserKind {
    /// Well-known executable names tried when no explicit path is configured.
    pub fn executable_candidates(&self) -> &'static [&'static str] {
        match self {
            BrowserKind::Chromium => &["chromium", "chromium-browser"],
            BrowserKind::Chrome => &["google-chrome", "google-chrome-stable", "chrome"],
            BrowserKind::Edge => &["microsoft-edge", "microsoft-edge-stable", "msedge"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Chrome => "chrome",
            BrowserKind::Edge => "edge",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BrowserSettings {
    #[serde(default)]
    pub kind: BrowserKind,
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Delay in milliseconds inserted after each page action.
    #[serde(default)]
    pub slow_mo: u64,
    /// Explicit browser executable; auto-detected from `kind` when absent.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Disable the browser sandbox (required in most CI containers).
    #[serde(default)]
    pub no_sandbox: bool,
    #[serde(default)]
    pub viewport: Viewport,
}

fn default_headless() -> bool {
    true
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            kind: BrowserKind::default(),
            headless: true,
            slow_mo: 0,
            executable: None,
            no_sandbox: false,
            viewport: Viewport::default(),
        }
    }
}

/// Millisecond wait budgets, tiered so call sites pick a size instead of a
/// number.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    #[serde(default = "default_short")]
    pub short: u64,
    #[serde(default = "default_medium")]
    pub medium: u64,
    #[serde(default = "default_long")]
    pub long: u64,
}

fn default_short() -> u64 {
    3_000
}
fn default_medium() -> u64 {
    5_000
}
fn default_long() -> u64 {
    10_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            short: default_short(),
            medium: default_medium(),
            long: default_long(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutTier {
    Short,
    Medium,
    Long,
}

impl TimeoutConfig {
    pub fn tier(&self, tier: TimeoutTier) -> Duration {
        let ms = match tier {
            TimeoutTier::Short => self.short,
            TimeoutTier::Medium => self.medium,
            TimeoutTier::Long => self.long,
        };
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub base_url: String,
    #[serde(default)]
    pub login_path: String,
}

impl AppConfig {
    /// Full login URL. `login_path` may be empty (login page is the base
    /// URL), absolute (used verbatim) or relative (joined onto the base).
    pub fn login_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.login_path.trim();
        if path.is_empty() {
            base.to_string()
        } else if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}/{}", base, path.trim_start_matches('/'))
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Falls back to `app.base_url` when absent.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    /// Codes the business-envelope check accepts as success. The backend's
    /// envelope convention varies per deployment, so this is configurable.
    #[serde(default)]
    pub success_codes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,
    #[serde(default = "default_trace_dir")]
    pub trace_dir: PathBuf,
    #[serde(default = "default_video_dir")]
    pub video_dir: PathBuf,
    #[serde(default = "default_har_dir")]
    pub har_dir: PathBuf,
    #[serde(default = "default_html_report")]
    pub html_report: PathBuf,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("reports/logs")
}
fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("reports/screenshots")
}
fn default_trace_dir() -> PathBuf {
    PathBuf::from("reports/traces")
}
fn default_video_dir() -> PathBuf {
    PathBuf::from("reports/videos")
}
fn default_har_dir() -> PathBuf {
    PathBuf::from("reports/har")
}
fn default_html_report() -> PathBuf {
    PathBuf::from("reports/report.html")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            screenshot_dir: default_screenshot_dir(),
            trace_dir: default_trace_dir(),
            video_dir: default_video_dir(),
            har_dir: default_har_dir(),
            html_report: default_html_report(),
        }
    }
}

impl ReportConfig {
    /// Root the HTML report links are made relative to.
    pub fn report_root(&self) -> &Path {
        self.html_report.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Resolved login credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Config {
    /// Load from `<dir>/config.yaml`, applying the `UI_AUTOMATION_ENV`
    /// override and the matching `config_<env>.yaml` overlay when present.
    ///
    /// The base file missing is fatal; a missing overlay is skipped.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let base_path = config_dir.join(BASE_CONFIG_FILE);
        let mut raw = load_yaml_file(&base_path)?;

        if let Ok(env_override) = env::var(ENV_VAR_ENV) {
            if !env_override.is_empty() {
                if let Value::Mapping(ref mut map) = raw {
                    map.insert(Value::from("env"), Value::from(env_override));
                }
            }
        }

        let env_name = raw
            .get("env")
            .and_then(Value::as_str)
            .unwrap_or("default")
            .to_string();

        if env_name != "default" {
            let overlay_path = config_dir.join(format!("config_{env_name}.yaml"));
            if overlay_path.exists() {
                let overlay = load_yaml_file(&overlay_path)?;
                raw = deep_merge(raw, overlay);
            } else {
                debug!(path = %overlay_path.display(), "no overlay config for environment");
            }
        }

        let config: Config = serde_yaml::from_value(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate once at load time; all problems are reported together.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.app.base_url.trim().is_empty() {
            problems.push("app.base_url must not be empty".to_string());
        } else if !self.app.base_url.starts_with("http") {
            problems.push(format!(
                "app.base_url must be an http(s) URL, got '{}'",
                self.app.base_url
            ));
        }
        if let Some(api_base) = &self.api.base_url {
            if !api_base.starts_with("http") {
                problems.push(format!(
                    "api.base_url must be an http(s) URL, got '{api_base}'"
                ));
            }
        }
        if self.timeout.short == 0 || self.timeout.medium == 0 || self.timeout.long == 0 {
            problems.push("timeout tiers must be positive milliseconds".to_string());
        }
        if self.timeout.short > self.timeout.medium || self.timeout.medium > self.timeout.long {
            problems.push(format!(
                "timeout tiers must be ordered short <= medium <= long, got {}/{}/{}",
                self.timeout.short, self.timeout.medium, self.timeout.long
            ));
        }
        if let Some(codes) = &self.api.success_codes {
            if codes.is_empty() {
                problems.push("api.success_codes must not be an empty list".to_string());
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(UtaError::config(format!(
                "invalid configuration: {}",
                problems.join("; ")
            )))
        }
    }

    /// Default login credentials: environment variables win over the config
    /// file. Missing either field is fatal at use time.
    pub fn credentials(&self) -> Result<Credentials> {
        let username = env::var(ENV_VAR_USERNAME)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.account.username.clone())
            .filter(|v| !v.is_empty());
        let password = env::var(ENV_VAR_PASSWORD)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.account.password.clone())
            .filter(|v| !v.is_empty());

        match (username, password) {
            (Some(username), Some(password)) => Ok(Credentials { username, password }),
            _ => Err(UtaError::config(format!(
                "default account credentials are not configured; set {ENV_VAR_USERNAME} / \
                 {ENV_VAR_PASSWORD} or account.username / account.password"
            ))),
        }
    }

    pub fn api_base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(&self.app.base_url)
    }

    /// One-line summary of the effective settings, for `--verbose` and
    /// `check-config`.
    pub fn effective_summary(&self, source: &Path) -> String {
        format!(
            "Effective config [{}]: env={}, browser={} (headless={}, slow_mo={}ms, viewport={}), \
             timeouts short={}ms / medium={}ms / long={}ms, app={}, api={}, reports={}",
            source.display(),
            self.env,
            self.browser.kind.as_str(),
            self.browser.headless,
            self.browser.slow_mo,
            self.browser.viewport,
            self.timeout.short,
            self.timeout.medium,
            self.timeout.long,
            self.app.base_url,
            self.api_base_url(),
            self.report.report_root().display(),
        )
    }
}

fn load_yaml_file(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(UtaError::config(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&text)?;
    if value.is_null() {
        return Ok(Value::Mapping(Default::default()));
    }
    Ok(value)
}

/// Recursively merge `overlay` over `base`: mappings merge key-by-key,
/// anything else is replaced by the overlay value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Mapping(base_map)
        }
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn merge_with_empty_overlay_is_identity() {
        let base = yaml("a: 1\nnested:\n  b: 2");
        let merged = deep_merge(base.clone(), Value::Mapping(Default::default()));
        assert_eq!(merged, base);
    }

    #[test]
    fn overlay_leaf_wins_on_collision() {
        let base = yaml("app:\n  base_url: http://base\n  login_path: /login");
        let overlay = yaml("app:\n  base_url: http://overlay");
        let merged = deep_merge(base, overlay);

        assert_eq!(
            merged["app"]["base_url"],
            Value::from("http://overlay"),
            "overlay leaf should win"
        );
        assert_eq!(
            merged["app"]["login_path"],
            Value::from("/login"),
            "non-colliding base key should survive"
        );
    }

    #[test]
    fn non_colliding_keys_from_both_sides_present() {
        let base = yaml("a: 1");
        let overlay = yaml("b: 2");
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["a"], Value::from(1));
        assert_eq!(merged["b"], Value::from(2));
    }

    #[test]
    fn scalar_replaced_by_mapping_overlay() {
        let base = yaml("x: 1");
        let overlay = yaml("x:\n  y: 2");
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["x"]["y"], Value::from(2));
    }

    #[test]
    fn login_url_with_empty_path_is_base() {
        let app = AppConfig {
            base_url: "http://app.example.com:8088/".to_string(),
            login_path: String::new(),
        };
        assert_eq!(app.login_url(), "http://app.example.com:8088");
    }

    #[test]
    fn login_url_with_relative_path_joins() {
        let app = AppConfig {
            base_url: "http://app.example.com".to_string(),
            login_path: "/login".to_string(),
        };
        assert_eq!(app.login_url(), "http://app.example.com/login");
    }

    #[test]
    fn login_url_with_absolute_path_is_used_verbatim() {
        let app = AppConfig {
            base_url: "http://app.example.com".to_string(),
            login_path: "https://sso.example.com/login".to_string(),
        };
        assert_eq!(app.login_url(), "https://sso.example.com/login");
    }

    #[test]
    fn validate_rejects_unordered_timeouts() {
        let config = Config {
            env: "default".into(),
            account: AccountConfig::default(),
            browser: BrowserSettings::default(),
            timeout: TimeoutConfig {
                short: 9_000,
                medium: 5_000,
                long: 10_000,
            },
            app: AppConfig {
                base_url: "http://app".into(),
                login_path: String::new(),
            },
            api: ApiConfig::default(),
            report: ReportConfig::default(),
        };
        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("ordered"));
    }

    #[test]
    fn validate_aggregates_all_problems() {
        let config = Config {
            env: "default".into(),
            account: AccountConfig::default(),
            browser: BrowserSettings::default(),
            timeout: TimeoutConfig {
                short: 0,
                medium: 5_000,
                long: 10_000,
            },
            app: AppConfig {
                base_url: String::new(),
                login_path: String::new(),
            },
            api: ApiConfig::default(),
            report: ReportConfig::default(),
        };
        let message = format!("{}", config.validate().unwrap_err());
        assert!(message.contains("base_url"));
        assert!(message.contains("positive"));
    }

    #[test]
    fn timeout_tiers_resolve_to_durations() {
        let timeouts = TimeoutConfig::default();
        assert_eq!(
            timeouts.tier(TimeoutTier::Short),
            Duration::from_millis(3_000)
        );
        assert_eq!(
            timeouts.tier(TimeoutTier::Medium),
            Duration::from_millis(5_000)
        );
        assert_eq!(
            timeouts.tier(TimeoutTier::Long),
            Duration::from_millis(10_000)
        );
    }

    #[test]
    fn api_base_url_falls_back_to_app() {
        let config = Config {
            env: "default".into(),
            account: AccountConfig::default(),
            browser: BrowserSettings::default(),
            timeout: TimeoutConfig::default(),
            app: AppConfig {
                base_url: "http://app".into(),
                login_path: String::new(),
            },
            api: ApiConfig::default(),
            report: ReportConfig::default(),
        };
        assert_eq!(config.api_base_url(), "http://app");

        let with_api = Config {
            api: ApiConfig {
                base_url: Some("http://api".into()),
                ..ApiConfig::default()
            },
            ..config
        };
        assert_eq!(with_api.api_base_url(), "http://api");
    }

    #[test]
    fn load_merges_overlay_for_named_environment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "env: dev\napp:\n  base_url: http://base\n  login_path: /login\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("config_dev.yaml"),
            "app:\n  base_url: http://dev\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.app.base_url, "http://dev");
        assert_eq!(config.app.login_path, "/login");
    }

    #[test]
    fn load_skips_missing_overlay() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "env: staging\napp:\n  base_url: http://base\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.app.base_url, "http://base");
        assert_eq!(config.env, "staging");
    }

    #[test]
    fn load_fails_for_missing_base_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, UtaError::Config(_)));
        assert!(format!("{err}").contains("config file not found"));
    }
}
