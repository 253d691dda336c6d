//! Trace recording: a timeline of page actions with screenshots and DOM
//! snapshots, exportable as a ZIP archive for post-hoc debugging.
//!
//! Recording starts when the test context is created and stops at teardown,
//! or earlier when the failure hook exports the archive.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chromiumoxide::Page;
use serde::Serialize;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::browser::page::capture_png;
use crate::error::{Result, UtaError};

/// One recorded step.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub kind: String,
    pub detail: String,
    pub elapsed_ms: u64,
    /// Archive-relative path of the screenshot taken after this step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Document markup after this step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dom: Option<String>,
}

#[derive(Debug, Serialize)]
struct TraceManifest<'a> {
    version: &'static str,
    events: &'a [TraceEvent],
}

#[derive(Debug)]
struct TracerInner {
    started: Instant,
    events: Vec<TraceEvent>,
    screenshots: Vec<Vec<u8>>,
    stopped: bool,
}

/// Shared, clonable trace recorder. Capture failures inside `record` only
/// degrade the trace; they never fail the action that triggered them.
#[derive(Debug, Clone)]
pub struct Tracer {
    inner: Arc<Mutex<TracerInner>>,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TracerInner {
                started: Instant::now(),
                events: Vec::new(),
                screenshots: Vec::new(),
                stopped: false,
            })),
        }
    }

    /// Record a step with a screenshot and DOM snapshot of the page.
    pub async fn record(&self, page: &Page, kind: &str, detail: &str) {
        let screenshot = match capture_png(page).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("trace screenshot skipped: {e}");
                None
            }
        };
        let dom = match page.evaluate("document.documentElement.outerHTML").await {
            Ok(result) => result.into_value::<String>().ok(),
            Err(e) => {
                debug!("trace DOM snapshot skipped: {e}");
                None
            }
        };

        let mut inner = self.inner.lock().expect("tracer lock poisoned");
        if inner.stopped {
            return;
        }
        let elapsed_ms = inner.started.elapsed().as_millis() as u64;
        let screenshot_ref = screenshot.map(|bytes| {
            let name = format!("screenshots/{:04}.png", inner.screenshots.len());
            inner.screenshots.push(bytes);
            name
        });
        inner.events.push(TraceEvent {
            kind: kind.to_string(),
            detail: detail.to_string(),
            elapsed_ms,
            screenshot: screenshot_ref,
            dom,
        });
    }

    /// Record a step without touching the page (e.g. flow step markers).
    pub fn record_plain(&self, kind: &str, detail: &str) {
        let mut inner = self.inner.lock().expect("tracer lock poisoned");
        if inner.stopped {
            return;
        }
        let elapsed_ms = inner.started.elapsed().as_millis() as u64;
        inner.events.push(TraceEvent {
            kind: kind.to_string(),
            detail: detail.to_string(),
            elapsed_ms,
            screenshot: None,
            dom: None,
        });
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lock().expect("tracer lock poisoned").stopped
    }

    pub fn event_count(&self) -> usize {
        self.inner.lock().expect("tracer lock poisoned").events.len()
    }

    /// Stop recording and discard the buffer (teardown path when the test
    /// passed and nobody exported the trace).
    pub fn stop(&self) {
        let mut inner = self.inner.lock().expect("tracer lock poisoned");
        if !inner.stopped {
            inner.stopped = true;
            inner.events.clear();
            inner.screenshots.clear();
        }
    }

    /// Stop recording and write the archive: `trace.json` plus the
    /// screenshots referenced from it.
    pub fn export(&self, path: &Path) -> Result<()> {
        let mut inner = self.inner.lock().expect("tracer lock poisoned");
        if inner.stopped {
            return Err(UtaError::browser("trace already stopped"));
        }
        inner.stopped = true;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        let mut archive = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let manifest = TraceManifest {
            version: "1",
            events: &inner.events,
        };
        archive.start_file("trace.json", options)?;
        archive.write_all(&serde_json::to_vec_pretty(&manifest)?)?;

        for (index, bytes) in inner.screenshots.iter().enumerate() {
            archive.start_file(format!("screenshots/{index:04}.png"), options)?;
            archive.write_all(bytes)?;
        }
        archive.finish()?;

        debug!(path = %path.display(), events = inner.events.len(), "trace exported");
        inner.events.clear();
        inner.screenshots.clear();
        Ok(())
    }

    /// Teardown helper: stop quietly, tolerating an earlier export.
    pub fn stop_best_effort(&self) {
        if self.is_stopped() {
            debug!("trace already stopped, nothing to do");
            return;
        }
        self.stop();
    }
}

/// Export wrapper used by the failure hook: logs instead of propagating, so
/// a broken trace never masks the test failure.
pub fn export_best_effort(tracer: &Tracer, path: &Path) -> Option<std::path::PathBuf> {
    match tracer.export(path) {
        Ok(()) => Some(path.to_path_buf()),
        Err(e) => {
            warn!("trace export failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_events_accumulate_in_order() {
        let tracer = Tracer::new();
        tracer.record_plain("step", "open login page");
        tracer.record_plain("step", "submit");
        assert_eq!(tracer.event_count(), 2);
    }

    #[test]
    fn stop_discards_buffered_events() {
        let tracer = Tracer::new();
        tracer.record_plain("step", "one");
        tracer.stop();
        assert!(tracer.is_stopped());
        assert_eq!(tracer.event_count(), 0);
    }

    #[test]
    fn events_after_stop_are_dropped() {
        let tracer = Tracer::new();
        tracer.stop();
        tracer.record_plain("step", "late");
        assert_eq!(tracer.event_count(), 0);
    }

    #[test]
    fn export_writes_zip_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traces/case_1.zip");
        let tracer = Tracer::new();
        tracer.record_plain("step", "one");

        tracer.export(&path).unwrap();
        assert!(path.is_file());
        assert!(tracer.is_stopped());
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[test]
    fn second_export_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.zip");
        let tracer = Tracer::new();
        tracer.export(&path).unwrap();

        let err = tracer.export(&path).unwrap_err();
        assert!(format!("{err}").contains("already stopped"));
    }

    #[test]
    fn best_effort_export_swallows_failure() {
        let tracer = Tracer::new();
        tracer.stop();
        let result = export_best_effort(&tracer, Path::new("/nonexistent/trace.zip"));
        assert!(result.is_none());
    }
}
