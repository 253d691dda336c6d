//! UI Test Automation (UTA) Library
//!
//! A harness for end-to-end UI and API checks: it drives a real browser
//! through business flows (page objects + flows), wraps an HTTP client for
//! API-level assertions, and captures failure artifacts (screenshots,
//! traces) into an HTML report.
//!
//! # Module Overview
//!
//! - [`browser`] - CDP browser sessions, per-test contexts, recorders
//! - [`pages`] - page objects (locators + primitive interactions)
//! - [`flows`] - business flows sequencing page-object calls
//! - [`api`] - HTTP client with status and business-envelope checks
//! - [`harness`] - test-session lifecycle and the failure-artifact hook
//! - [`config`] - layered YAML configuration
//! - [`report`] - per-case results and the HTML report
//!
//! # Example
//!
//! ```no_run
//! use uta_lib::{Config, ContextOptions, LoginFlow, TestSession};
//!
//! # async fn example() -> uta_lib::Result<()> {
//! let config = Config::load(std::path::Path::new("configs"))?;
//! let mut session = TestSession::start(config, "login smoke")?;
//!
//! session
//!     .run_case("login_success", ContextOptions::from_env(), |page, config| async move {
//!         LoginFlow::new(&page, &config).login_should_succeed(None).await
//!     })
//!     .await;
//!
//! let report = session.finish()?;
//! assert!(report.all_passed());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod browser;
pub mod config;
pub mod error;
pub mod flows;
pub mod harness;
pub mod locator;
pub mod logging;
pub mod pages;
pub mod report;
pub mod viewport;

pub use api::{ApiClient, BusinessCheck, RequestOptions};
pub use browser::{
    BrowserSession, ContextOptions, PageHandle, StorageState, TestContext, Tracer, WaitUntil,
    DEFAULT_STORAGE_STATE_PATH,
};
pub use config::{
    AppConfig, BrowserKind, Config, Credentials, TimeoutConfig, TimeoutTier,
};
pub use error::{ErrorCategory, ErrorPayload, Result, UtaError};
pub use flows::LoginFlow;
pub use harness::TestSession;
pub use locator::Locator;
pub use pages::LoginPage;
pub use report::{CaseArtifacts, CaseResult, CaseStatus, TestReport};
pub use viewport::Viewport;
