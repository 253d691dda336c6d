//! Browser session lifecycle.
//!
//! Ownership nesting is strict: the session outlives every test context it
//! produces, and a context owns its browser process, page and recorders.
//! Each test gets a fresh browser process with its own profile directory,
//! so no cookie or storage state leaks between tests; closing the context
//! invalidates everything beneath it.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser::har::HarRecorder;
use crate::browser::page::PageHandle;
use crate::browser::storage::StorageState;
use crate::browser::trace::Tracer;
use crate::browser::video::{VideoRecorder, FRAME_INTERVAL};
use crate::config::{BrowserKind, BrowserSettings, Config, ReportConfig, TimeoutConfig};
use crate::error::{Result, UtaError};
use crate::report::timestamped_path;

/// Boolean-ish env var enabling per-test video capture.
pub const ENV_VAR_RECORD_VIDEO: &str = "UI_RECORD_VIDEO";
/// Boolean-ish env var enabling per-test HAR capture.
pub const ENV_VAR_RECORD_HAR: &str = "UI_RECORD_HAR";

static PROFILE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Per-context knobs, resolved from env vars and the config.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Load this persisted authentication snapshot before the test runs.
    pub storage_state: Option<PathBuf>,
    pub record_video: bool,
    pub record_har: bool,
}

impl ContextOptions {
    /// Plain context with recording toggles read from the environment.
    pub fn from_env() -> Self {
        Self {
            storage_state: None,
            record_video: env_flag(ENV_VAR_RECORD_VIDEO),
            record_har: env_flag(ENV_VAR_RECORD_HAR),
        }
    }

    pub fn with_storage_state(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_state = Some(path.into());
        self
    }
}

/// Session-scoped browser engine: launch settings resolved once, shared by
/// every per-test context.
#[derive(Debug)]
pub struct BrowserSession {
    settings: BrowserSettings,
    timeouts: TimeoutConfig,
    report: ReportConfig,
    executable: Option<PathBuf>,
}

impl BrowserSession {
    /// Resolve the engine once at session start. A configured executable
    /// that does not exist is fatal here rather than at the first test.
    pub fn start(config: &Config) -> Result<Self> {
        let settings = config.browser.clone();
        let executable = resolve_executable(&settings)?;
        match &executable {
            Some(path) => info!(
                kind = settings.kind.as_str(),
                executable = %path.display(),
                headless = settings.headless,
                "browser engine ready"
            ),
            None => info!(
                kind = settings.kind.as_str(),
                headless = settings.headless,
                "browser engine ready (auto-detected executable)"
            ),
        }
        Ok(Self {
            settings,
            timeouts: config.timeout,
            report: config.report.clone(),
            executable,
        })
    }

    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    /// Launch an isolated browser process and open its page.
    pub async fn new_context(&self, test_name: &str, options: ContextOptions) -> Result<TestContext> {
        let profile_dir = env::temp_dir().join(format!(
            "uta-profile-{}-{}",
            std::process::id(),
            PROFILE_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&profile_dir)?;

        let mut builder = CdpConfig::builder()
            .window_size(self.settings.viewport.width, self.settings.viewport.height)
            .user_data_dir(&profile_dir);
        if !self.settings.headless {
            builder = builder.with_head();
        }
        if self.settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|e| UtaError::browser(format!("invalid browser configuration: {e}")))?;

        info!(test = test_name, "launching browser");
        let (browser, mut handler) = Browser::launch(cdp_config).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;

        let authenticated = options.storage_state.is_some();
        if let Some(state_path) = &options.storage_state {
            let state = StorageState::load(state_path)?;
            info!(test = test_name, path = %state_path.display(), "loading storage state");
            state.apply(&page).await?;
        }

        let har = if options.record_har {
            info!(test = test_name, "HAR capture enabled");
            Some(HarRecorder::start(&page).await?)
        } else {
            None
        };
        let video = if options.record_video {
            info!(test = test_name, "video capture enabled");
            Some(VideoRecorder::start(page.clone(), FRAME_INTERVAL))
        } else {
            None
        };

        let tracer = Tracer::new();
        tracer.record_plain("context", &format!("context created for {test_name}"));

        let handle = PageHandle::new(
            page,
            self.timeouts,
            Duration::from_millis(self.settings.slow_mo),
            tracer,
        );

        Ok(TestContext {
            test_name: test_name.to_string(),
            browser,
            handler_task,
            page: handle,
            har,
            video,
            profile_dir,
            report: self.report.clone(),
            authenticated,
        })
    }

    /// Stop the engine. Contexts are torn down individually per test; this
    /// only marks the end of the session.
    pub fn close(self) {
        info!("browser engine stopped");
    }
}

/// Locate the executable for the configured engine: explicit path first,
/// then well-known names on PATH, else let the launcher auto-detect.
fn resolve_executable(settings: &BrowserSettings) -> Result<Option<PathBuf>> {
    if let Some(path) = &settings.executable {
        if !path.exists() {
            return Err(UtaError::config(format!(
                "configured browser executable does not exist: {}",
                path.display()
            )));
        }
        return Ok(Some(path.clone()));
    }
    Ok(find_on_path(settings.kind))
}

fn find_on_path(kind: BrowserKind) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        for candidate in kind.executable_candidates() {
            let full = dir.join(candidate);
            if full.is_file() {
                debug!(executable = %full.display(), "found browser on PATH");
                return Some(full);
            }
        }
    }
    None
}

/// One test's isolated browser, page and recorders.
#[derive(Debug)]
pub struct TestContext {
    test_name: String,
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: PageHandle,
    har: Option<HarRecorder>,
    video: Option<VideoRecorder>,
    profile_dir: PathBuf,
    report: ReportConfig,
    authenticated: bool,
}

impl TestContext {
    pub fn page(&self) -> &PageHandle {
        &self.page
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Whether this context was seeded from a storage-state snapshot.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Tear down everything this test owns. Recorder flushing is
    /// best-effort; the browser process is always closed.
    pub async fn teardown(mut self) {
        if let Some(mut har) = self.har.take() {
            let path = timestamped_path(&self.report.har_dir, &self.test_name, "har");
            har.write_best_effort(&path);
        }
        if let Some(mut video) = self.video.take() {
            let path = timestamped_path(&self.report.video_dir, &self.test_name, "gif");
            video.stop_best_effort(&path);
        }
        self.page.tracer().stop_best_effort();

        if let Err(e) = self.browser.close().await {
            warn!("browser close failed: {e}");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();

        if let Err(e) = std::fs::remove_dir_all(&self.profile_dir) {
            debug!("profile dir cleanup failed: {e}");
        }
        info!(test = self.test_name, "context torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_flag_accepts_boolean_ish_values() {
        env::set_var("UTA_TEST_FLAG_A", "TRUE");
        assert!(env_flag("UTA_TEST_FLAG_A"));
        env::set_var("UTA_TEST_FLAG_A", "yes");
        assert!(env_flag("UTA_TEST_FLAG_A"));
        env::set_var("UTA_TEST_FLAG_A", "0");
        assert!(!env_flag("UTA_TEST_FLAG_A"));
        env::remove_var("UTA_TEST_FLAG_A");
        assert!(!env_flag("UTA_TEST_FLAG_A"));
    }

    #[test]
    fn context_options_default_is_plain() {
        let options = ContextOptions::default();
        assert!(options.storage_state.is_none());
        assert!(!options.record_video);
        assert!(!options.record_har);
    }

    #[test]
    fn with_storage_state_marks_authenticated_path() {
        let options = ContextOptions::default().with_storage_state("artifacts/storage_state.json");
        assert_eq!(
            options.storage_state.as_deref(),
            Some(Path::new("artifacts/storage_state.json"))
        );
    }

    #[test]
    fn missing_configured_executable_is_fatal() {
        let settings = BrowserSettings {
            executable: Some(PathBuf::from("/nonexistent/chromium-binary")),
            ..BrowserSettings::default()
        };
        let err = resolve_executable(&settings).unwrap_err();
        assert!(matches!(err, UtaError::Config(_)));
    }

    #[test]
    fn executable_candidates_cover_all_kinds() {
        assert!(BrowserKind::Chromium
            .executable_candidates()
            .contains(&"chromium"));
        assert!(BrowserKind::Chrome
            .executable_candidates()
            .contains(&"google-chrome"));
        assert!(BrowserKind::Edge
            .executable_candidates()
            .contains(&"microsoft-edge"));
    }
}
