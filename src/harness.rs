//! Test session lifecycle.
//!
//! A session owns the logger, the browser engine and the report. Each case
//! gets an isolated context that is torn down on every exit path; when the
//! case body fails, the failure hook captures a screenshot and exports the
//! trace before teardown, then the failure propagates into the report.
//! Artifact capture itself is best-effort and never masks the original
//! failure.

use std::future::Future;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::browser::trace::export_best_effort;
use crate::browser::{BrowserSession, ContextOptions, PageHandle, TestContext};
use crate::config::Config;
use crate::error::Result;
use crate::logging::{self, LogGuard};
use crate::report::{timestamped_path, CaseArtifacts, CaseResult, TestReport};

pub struct TestSession {
    config: Config,
    session: BrowserSession,
    report: TestReport,
    _log_guard: LogGuard,
}

impl TestSession {
    /// Bring up logging and the browser engine for a suite.
    pub fn start(config: Config, suite_name: &str) -> Result<Self> {
        let log_guard = logging::init(&config.report)?;
        info!(suite = suite_name, env = %config.env, "test session starting");
        let session = BrowserSession::start(&config)?;
        Ok(Self {
            report: TestReport::new(suite_name),
            session,
            config,
            _log_guard: log_guard,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn report(&self) -> &TestReport {
        &self.report
    }

    /// Run one case in a fresh context. Returns whether it passed.
    ///
    /// Context setup failures are recorded as failures without artifact
    /// capture (there is no page to capture); body failures go through the
    /// failure hook first.
    pub async fn run_case<F, Fut>(&mut self, name: &str, options: ContextOptions, body: F) -> bool
    where
        F: FnOnce(PageHandle, Config) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        info!(case = name, "case starting");
        let started = Instant::now();

        let context = match self.session.new_context(name, options).await {
            Ok(context) => context,
            Err(e) => {
                warn!(case = name, "context setup failed, no page to capture artifacts from");
                self.report
                    .record(CaseResult::failed(name, started.elapsed(), format!("{e}")));
                return false;
            }
        };

        let outcome = body(context.page().clone(), self.config.clone()).await;
        let duration = started.elapsed();

        let passed = match outcome {
            Ok(()) => {
                info!(case = name, "case passed");
                self.report.record(CaseResult::passed(name, duration));
                true
            }
            Err(e) => {
                error!(case = name, "case failed: {e}");
                let artifacts = self.capture_failure_artifacts(name, &context).await;
                self.report.record(
                    CaseResult::failed(name, duration, format!("{e}")).with_artifacts(artifacts),
                );
                false
            }
        };

        context.teardown().await;
        passed
    }

    /// The failure hook: full-page screenshot plus trace export, each
    /// individually best-effort.
    async fn capture_failure_artifacts(&self, name: &str, context: &TestContext) -> CaseArtifacts {
        let report_config = &self.config.report;
        let mut artifacts = CaseArtifacts::default();

        let screenshot_path = timestamped_path(&report_config.screenshot_dir, name, "png");
        match context.page().screenshot(&screenshot_path).await {
            Ok(path) => {
                error!(case = name, path = %path.display(), "failure screenshot saved");
                artifacts.screenshot = Some(path);
            }
            Err(e) => warn!(case = name, "failure screenshot could not be taken: {e}"),
        }

        let trace_path = timestamped_path(&report_config.trace_dir, name, "zip");
        match export_best_effort(context.page().tracer(), &trace_path) {
            Some(path) => {
                error!(case = name, path = %path.display(), "failure trace exported");
                artifacts.trace = Some(path);
            }
            None => warn!(case = name, "failure trace could not be exported"),
        }

        artifacts
    }

    /// Stop the engine and write the HTML report.
    pub fn finish(self) -> Result<TestReport> {
        let Self {
            config,
            session,
            report,
            _log_guard,
        } = self;
        session.close();
        report.write_html(&config.report.html_report)?;
        info!(
            report = %config.report.html_report.display(),
            "{}",
            report.summary()
        );
        Ok(report)
    }
}
