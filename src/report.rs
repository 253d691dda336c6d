//! Test report: per-case results, failure artifacts and the HTML summary.
//!
//! Artifact files are named `<case>_<timestamp>` so parallel retries never
//! collide, and links in the HTML are made relative to the report root so
//! the directory can be zipped up and opened anywhere.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Timestamped artifact path under `dir`, with the test name sanitized to
/// a filesystem-friendly form.
pub fn timestamped_path(dir: &Path, test_name: &str, extension: &str) -> PathBuf {
    let safe_name: String = test_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
    dir.join(format!("{safe_name}_{timestamp}.{extension}"))
}

/// Make `path` relative to the report root when it lives underneath it,
/// otherwise keep it as-is.
pub fn relative_to_root(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseStatus {
    Passed,
    Failed,
}

impl CaseStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, CaseStatus::Failed)
    }
}

/// Artifacts captured by the failure hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseArtifacts {
    pub screenshot: Option<PathBuf>,
    pub trace: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub name: String,
    pub status: CaseStatus,
    pub duration: Duration,
    pub error: Option<String>,
    #[serde(default)]
    pub artifacts: CaseArtifacts,
}

impl CaseResult {
    pub fn passed(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: CaseStatus::Passed,
            duration,
            error: None,
            artifacts: CaseArtifacts::default(),
        }
    }

    pub fn failed(name: impl Into<String>, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CaseStatus::Failed,
            duration,
            error: Some(error.into()),
            artifacts: CaseArtifacts::default(),
        }
    }

    pub fn with_artifacts(mut self, artifacts: CaseArtifacts) -> Self {
        self.artifacts = artifacts;
        self
    }
}

/// Accumulated results for one harness run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub suite_name: String,
    pub results: Vec<CaseResult>,
}

impl TestReport {
    pub fn new(suite_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            results: Vec::new(),
        }
    }

    pub fn record(&mut self, result: CaseResult) {
        self.results.push(result);
    }

    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    pub fn passed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == CaseStatus::Passed)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == CaseStatus::Failed)
            .count()
    }

    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn total_duration(&self) -> Duration {
        self.results.iter().map(|r| r.duration).sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} passed",
            self.suite_name,
            self.passed_count(),
            self.total_count()
        )
    }

    /// Write the HTML report; artifact links are relativized to the file's
    /// parent directory.
    pub fn write_html(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::write(path, self.render_html(root))?;
        Ok(())
    }

    /// Render the report. Failed cases embed their screenshot inline and
    /// link the trace archive.
    pub fn render_html(&self, root: &Path) -> String {
        let mut html = String::new();
        html.push_str(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>UI Test Report</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 20px; }
        .summary { background: #f5f5f5; padding: 20px; border-radius: 8px; margin-bottom: 20px; }
        .case { padding: 10px; margin: 5px 0; border-radius: 4px; }
        .case.pass { background: #e8f5e9; border-left: 4px solid #4caf50; }
        .case.fail { background: #ffebee; border-left: 4px solid #f44336; }
        .error { color: #d32f2f; font-family: monospace; white-space: pre-wrap; }
        .artifact img { max-width: 640px; border: 1px solid #ddd; margin-top: 8px; }
    </style>
</head>
<body>
"#,
        );

        let pass_rate = if self.total_count() == 0 {
            100.0
        } else {
            self.passed_count() as f64 / self.total_count() as f64 * 100.0
        };
        html.push_str(&format!(
            r#"<div class="summary">
    <h1>{}</h1>
    <h2>{}/{} passed ({:.1}%)</h2>
    <p>Duration: {:.2}s</p>
</div>
"#,
            escape_html(&self.suite_name),
            self.passed_count(),
            self.total_count(),
            pass_rate,
            self.total_duration().as_secs_f64()
        ));

        for result in &self.results {
            let class = if result.status.is_failed() { "fail" } else { "pass" };
            html.push_str(&format!(
                "<div class=\"case {}\">\n    <strong>{}</strong> ({:.2}s)\n",
                class,
                escape_html(&result.name),
                result.duration.as_secs_f64()
            ));
            if let Some(error) = &result.error {
                html.push_str(&format!(
                    "    <div class=\"error\">{}</div>\n",
                    escape_html(error)
                ));
            }
            if let Some(screenshot) = &result.artifacts.screenshot {
                let rel = relative_to_root(screenshot, root);
                html.push_str(&format!(
                    "    <div class=\"artifact\"><img src=\"{}\" alt=\"failure screenshot\"></div>\n",
                    rel.to_string_lossy().replace('\\', "/")
                ));
            }
            if let Some(trace) = &result.artifacts.trace {
                let rel = relative_to_root(trace, root);
                html.push_str(&format!(
                    "    <div class=\"artifact\"><a href=\"{}\" target=\"_blank\">Download trace</a></div>\n",
                    rel.to_string_lossy().replace('\\', "/")
                ));
            }
            html.push_str("</div>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamped_path_sanitizes_and_keeps_extension() {
        let path = timestamped_path(Path::new("reports/screenshots"), "login should fail!", "png");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("login_should_fail_"));
        assert!(name.ends_with(".png"));
        assert!(!name.contains(' '));
    }

    #[test]
    fn two_paths_for_same_test_differ() {
        let a = timestamped_path(Path::new("x"), "case", "zip");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = timestamped_path(Path::new("x"), "case", "zip");
        assert_ne!(a, b);
    }

    #[test]
    fn relative_conversion_strips_known_root() {
        let rel = relative_to_root(
            Path::new("reports/screenshots/a.png"),
            Path::new("reports"),
        );
        assert_eq!(rel, Path::new("screenshots/a.png"));
    }

    #[test]
    fn relative_conversion_keeps_foreign_paths() {
        let rel = relative_to_root(Path::new("/tmp/elsewhere/a.png"), Path::new("reports"));
        assert_eq!(rel, Path::new("/tmp/elsewhere/a.png"));
    }

    #[test]
    fn report_counts_and_summary() {
        let mut report = TestReport::new("login suite");
        report.record(CaseResult::passed("ok_case", Duration::from_secs(1)));
        report.record(CaseResult::failed(
            "bad_case",
            Duration::from_secs(2),
            "Assertion failed: expected success indicator",
        ));

        assert_eq!(report.total_count(), 2);
        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.all_passed());
        assert_eq!(report.summary(), "login suite: 1/2 passed");
    }

    #[test]
    fn html_embeds_screenshot_and_links_trace() {
        let mut report = TestReport::new("suite");
        let artifacts = CaseArtifacts {
            screenshot: Some(PathBuf::from("reports/screenshots/bad_1.png")),
            trace: Some(PathBuf::from("reports/traces/bad_1.zip")),
        };
        report.record(
            CaseResult::failed("bad", Duration::from_secs(1), "boom").with_artifacts(artifacts),
        );

        let html = report.render_html(Path::new("reports"));
        assert!(html.contains("<img src=\"screenshots/bad_1.png\""));
        assert!(html.contains("<a href=\"traces/bad_1.zip\""));
        assert!(html.contains("boom"));
    }

    #[test]
    fn html_escapes_error_text() {
        let mut report = TestReport::new("suite");
        report.record(CaseResult::failed(
            "bad",
            Duration::from_secs(1),
            "expected <div> & got none",
        ));
        let html = report.render_html(Path::new("reports"));
        assert!(html.contains("expected &lt;div&gt; &amp; got none"));
    }

    #[test]
    fn write_html_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/report.html");
        TestReport::new("suite").write_html(&path).unwrap();
        assert!(path.is_file());
    }
}
