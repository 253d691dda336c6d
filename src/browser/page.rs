//! Page handle: navigation, element interaction and capture primitives.
//!
//! All waits are explicit polling with a deadline. An expired budget is a
//! `Timeout` error for actions and reads; visibility checks instead resolve
//! to `false`, which is the one place a timeout is an answer rather than a
//! failure.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use base64::Engine;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::Page;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::browser::trace::Tracer;
use crate::config::{TimeoutConfig, TimeoutTier};
use crate::error::{Result, UtaError};
use crate::locator::Locator;

/// Polling interval for element and load-state waits.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Quiet window that counts as "network idle".
pub const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Load states a navigation can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
    #[default]
    Load,
    DomContentLoaded,
    NetworkIdle,
}

impl WaitUntil {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle => "networkidle",
        }
    }
}

/// One browser tab, scoped to a single test.
#[derive(Debug, Clone)]
pub struct PageHandle {
    page: Page,
    timeouts: TimeoutConfig,
    slow_mo: Duration,
    tracer: Tracer,
}

impl PageHandle {
    pub fn new(page: Page, timeouts: TimeoutConfig, slow_mo: Duration, tracer: Tracer) -> Self {
        Self {
            page,
            timeouts,
            slow_mo,
            tracer,
        }
    }

    /// Raw CDP page, for recorders that subscribe to page events.
    pub fn cdp_page(&self) -> &Page {
        &self.page
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    fn resolve_timeout(&self, tier: Option<TimeoutTier>) -> Duration {
        self.timeouts.tier(tier.unwrap_or(TimeoutTier::Medium))
    }

    async fn slow_mo_pause(&self) {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
    }

    async fn eval(&self, script: &str) -> Result<Value> {
        let result = self.page.evaluate(script).await?;
        result
            .into_value::<Value>()
            .map_err(|e| UtaError::browser(format!("failed to decode evaluation result: {e}")))
    }

    /// Navigate and wait for the requested load state with the long budget.
    pub async fn goto(&self, url: &str, wait_until: WaitUntil) -> Result<()> {
        info!(url, wait_until = wait_until.as_str(), "navigating");
        self.page.goto(url).await?;
        self.wait_for_load_state(wait_until, Some(TimeoutTier::Long))
            .await?;
        self.tracer
            .record(&self.page, "navigation", &format!("goto {url}"))
            .await;
        self.slow_mo_pause().await;
        Ok(())
    }

    /// Wait until the document reaches `state`, failing past the budget.
    pub async fn wait_for_load_state(
        &self,
        state: WaitUntil,
        tier: Option<TimeoutTier>,
    ) -> Result<()> {
        let timeout = self.resolve_timeout(tier);
        debug!(state = state.as_str(), timeout_ms = timeout.as_millis() as u64, "waiting for load state");
        match state {
            WaitUntil::Load => {
                self.poll_js_bool("document.readyState === 'complete'", "load event", timeout)
                    .await
            }
            WaitUntil::DomContentLoaded => {
                self.poll_js_bool(
                    "document.readyState === 'interactive' || document.readyState === 'complete'",
                    "DOMContentLoaded",
                    timeout,
                )
                .await
            }
            WaitUntil::NetworkIdle => self.wait_for_network_idle(timeout).await,
        }
    }

    /// Idle means the document finished loading and no new resource fetches
    /// appeared for [`NETWORK_IDLE_WINDOW`].
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
        const PROBE: &str = "(() => ({ ready: document.readyState, \
             resources: performance.getEntriesByType('resource').length }))()";

        let deadline = Instant::now() + timeout;
        let mut last_count: Option<u64> = None;
        let mut quiet_since = Instant::now();

        loop {
            let probe = self.eval(PROBE).await?;
            let ready = probe
                .get("ready")
                .and_then(Value::as_str)
                .map(|s| s == "complete")
                .unwrap_or(false);
            let count = probe.get("resources").and_then(Value::as_u64).unwrap_or(0);

            if last_count != Some(count) {
                last_count = Some(count);
                quiet_since = Instant::now();
            }

            if ready && quiet_since.elapsed() >= NETWORK_IDLE_WINDOW {
                return Ok(());
            }
            if Instant::now() >= deadline {
                let err = UtaError::timeout("network idle", timeout.as_millis() as u64);
                error!("{err}");
                return Err(err);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn poll_js_bool(&self, script: &str, what: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval(script).await?.as_bool().unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                let err = UtaError::timeout(what, timeout.as_millis() as u64);
                error!("{err}");
                return Err(err);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Click, auto-waiting for the element to exist and have a box.
    pub async fn click(&self, locator: &Locator, tier: Option<TimeoutTier>) -> Result<()> {
        let timeout = self.resolve_timeout(tier);
        info!(%locator, timeout_ms = timeout.as_millis() as u64, "click");
        let script = locator.to_click_script();
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval(&script).await?.as_str() == Some("ok") {
                break;
            }
            if Instant::now() >= deadline {
                let err = UtaError::timeout(
                    format!("clickable element {locator}"),
                    timeout.as_millis() as u64,
                );
                error!("{err}");
                return Err(err);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        self.tracer
            .record(&self.page, "click", &locator.to_string())
            .await;
        self.slow_mo_pause().await;
        Ok(())
    }

    /// Fill an input, auto-waiting for it to appear. The value is set via
    /// the native setter and input/change events are dispatched.
    pub async fn fill(
        &self,
        locator: &Locator,
        value: &str,
        tier: Option<TimeoutTier>,
    ) -> Result<()> {
        let timeout = self.resolve_timeout(tier);
        info!(%locator, timeout_ms = timeout.as_millis() as u64, "fill");
        let script = locator.to_fill_script(value);
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval(&script).await?.as_str() == Some("ok") {
                break;
            }
            if Instant::now() >= deadline {
                let err = UtaError::timeout(
                    format!("fillable element {locator}"),
                    timeout.as_millis() as u64,
                );
                error!("{err}");
                return Err(err);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        self.tracer
            .record(&self.page, "fill", &locator.to_string())
            .await;
        self.slow_mo_pause().await;
        Ok(())
    }

    /// Rendered text of the element; times out if it never appears.
    pub async fn inner_text(&self, locator: &Locator, tier: Option<TimeoutTier>) -> Result<String> {
        let timeout = self.resolve_timeout(tier);
        info!(%locator, timeout_ms = timeout.as_millis() as u64, "read text");
        let script = locator.to_text_script();
        let deadline = Instant::now() + timeout;
        loop {
            let value = self.eval(&script).await?;
            if let Some(text) = value.as_str() {
                debug!(%locator, text, "read text result");
                return Ok(text.to_string());
            }
            if Instant::now() >= deadline {
                let err = UtaError::timeout(format!("element {locator}"), timeout.as_millis() as u64);
                error!("{err}");
                return Err(err);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Poll for visibility within the budget. An expired budget is `false`,
    /// not an error; protocol failures still propagate.
    pub async fn is_visible(&self, locator: &Locator, tier: Option<TimeoutTier>) -> Result<bool> {
        let timeout = self.resolve_timeout(tier);
        debug!(%locator, timeout_ms = timeout.as_millis() as u64, "visibility check");
        let script = locator.to_visibility_query();
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval(&script).await?.as_bool().unwrap_or(false) {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                warn!(%locator, "element not visible within budget");
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Full-page PNG screenshot written to `path`.
    pub async fn screenshot(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = capture_png(&self.page).await?;
        std::fs::write(path, &bytes)?;
        info!(path = %path.display(), "screenshot saved");
        Ok(path.to_path_buf())
    }

    /// Current document markup, used for trace snapshots.
    pub async fn dom_snapshot(&self) -> Result<String> {
        let value = self.eval("document.documentElement.outerHTML").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn current_url(&self) -> Result<String> {
        let url = self.page.url().await?;
        Ok(url.unwrap_or_default())
    }

    /// Evaluate an arbitrary expression and decode the result.
    pub async fn evaluate(&self, script: &str) -> Result<Value> {
        self.eval(script).await
    }
}

/// Capture a full-page PNG from a raw CDP page. Shared by the page handle,
/// the tracer and the video recorder.
pub(crate) async fn capture_png(page: &Page) -> Result<Vec<u8>> {
    let params = CaptureScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .capture_beyond_viewport(true)
        .build();
    let response = page.execute(params).await?;
    base64::engine::general_purpose::STANDARD
        .decode(&response.data)
        .map_err(|e| UtaError::browser(format!("invalid screenshot payload: {e}")))
}
