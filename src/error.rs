use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError;

#[derive(Debug, Error)]
pub enum UtaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Browser protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timed out after {waited_ms}ms waiting for {what}")]
    Timeout { what: String, waited_ms: u64 },

    #[error("Unexpected HTTP status: expected {expected}, got {actual}. Body preview: {body_preview}")]
    HttpStatus {
        expected: u16,
        actual: u16,
        body_preview: String,
    },

    #[error("Response is not JSON (status {status}): {body}")]
    ResponseNotJson { status: u16, body: String },

    #[error("Business check failed: code={code}, msg={message}")]
    Business { code: String, message: String },

    #[error("Assertion failed: {0}")]
    Assertion(String),
}

impl UtaError {
    pub fn config(message: impl Into<String>) -> Self {
        UtaError::Config(message.into())
    }

    pub fn browser(message: impl Into<String>) -> Self {
        UtaError::Browser(message.into())
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        UtaError::Assertion(message.into())
    }

    pub fn timeout(what: impl Into<String>, waited_ms: u64) -> Self {
        UtaError::Timeout {
            what: what.into(),
            waited_ms,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            UtaError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check file paths/permissions.",
            ),
            UtaError::Yaml(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check configs/config.yaml syntax and field types.",
            ),
            UtaError::Json(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check JSON inputs; rerun with --verbose for details.",
            ),
            UtaError::Network(e) => ErrorPayload::new(
                ErrorCategory::Network,
                e.to_string(),
                "Check connectivity/proxy/VPN and retry.",
            ),
            UtaError::InvalidUrl(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Verify URL format (e.g., https://example.com).",
            ),
            UtaError::Cdp(e) => ErrorPayload::new(
                ErrorCategory::Browser,
                e.to_string(),
                "Ensure a Chromium-family browser is installed and reachable; set browser.executable if auto-detection fails.",
            ),
            UtaError::Image(e) => ErrorPayload::new(
                ErrorCategory::Artifact,
                e.to_string(),
                "Screenshot decoding failed; check the browser produced a valid PNG.",
            ),
            UtaError::Zip(e) => ErrorPayload::new(
                ErrorCategory::Artifact,
                e.to_string(),
                "Trace archive could not be written; check disk space and the trace directory.",
            ),
            UtaError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("storage state") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Run `uta generate-storage-state` to create a fresh login snapshot.",
                    )
                } else if lower.contains("credential") || lower.contains("account") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Set UI_ACCOUNT_USERNAME / UI_ACCOUNT_PASSWORD or fill account.username / account.password in the config.",
                    )
                } else if lower.contains("config file") || lower.contains("config.yaml") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Create configs/config.yaml or pass --config-dir pointing at a directory that contains one.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check flags/paths and the configuration file.",
                    )
                }
            }
            UtaError::Browser(msg) => ErrorPayload::new(
                ErrorCategory::Browser,
                msg.to_string(),
                "Check the browser installation and headless settings; rerun with --verbose.",
            ),
            UtaError::Timeout { what, waited_ms } => ErrorPayload::new(
                ErrorCategory::Timeout,
                format!("timed out after {waited_ms}ms waiting for {what}"),
                "Increase the timeout tier in the config or verify the page actually reaches this state.",
            ),
            UtaError::HttpStatus { .. } | UtaError::ResponseNotJson { .. } => ErrorPayload::new(
                ErrorCategory::Api,
                self.to_string(),
                "Inspect the API response; the backend may be down or the contract changed.",
            ),
            UtaError::Business { .. } => ErrorPayload::new(
                ErrorCategory::Api,
                self.to_string(),
                "The backend reported a business failure; check the code/msg against the API docs.",
            ),
            UtaError::Assertion(msg) => ErrorPayload::new(
                ErrorCategory::Assertion,
                msg.to_string(),
                "See the failure screenshot and trace under the reports directory.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, UtaError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Network,
    Browser,
    Api,
    Timeout,
    Assertion,
    Artifact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
