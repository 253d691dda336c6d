//! HTTP client wrapper for API-level assertions.
//!
//! Each call merges headers (per-call over bearer token over client
//! defaults), asserts the HTTP status, parses the body as JSON and
//! optionally verifies the backend's business-success envelope before
//! handing the payload back.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{Result, UtaError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const BODY_PREVIEW_LIMIT: usize = 500;

/// Codes treated as business success when none are configured.
pub const DEFAULT_SUCCESS_CODES: &[&str] = &["0", "SUCCESS", "SUCCESSFUL", "OK"];

/// Business-success envelope check.
///
/// Backends signal application-level success independently of the HTTP
/// status, usually as `{"code": 0, ...}` or `{"success": true, ...}`. The
/// accepted code set is configurable per deployment.
#[derive(Debug, Clone)]
pub struct BusinessCheck {
    success_codes: Vec<String>,
}

impl Default for BusinessCheck {
    fn default() -> Self {
        Self {
            success_codes: DEFAULT_SUCCESS_CODES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BusinessCheck {
    pub fn new(success_codes: Vec<String>) -> Self {
        Self { success_codes }
    }

    /// Inspect a parsed body. `code` wins over `success`; a body with
    /// neither field is unverifiable and passes with a warning.
    pub fn evaluate(&self, body: &Value) -> Result<()> {
        if let Some(code) = body.get("code") {
            let code_text = match code {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if self.success_codes.contains(&code_text) {
                return Ok(());
            }
            let message = body
                .get("msg")
                .or_else(|| body.get("message"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(UtaError::Business {
                code: code_text,
                message,
            });
        }

        if let Some(success) = body.get("success") {
            if success == &Value::Bool(true) {
                return Ok(());
            }
            let message = body
                .get("message")
                .or_else(|| body.get("msg"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(UtaError::Business {
                code: success.to_string(),
                message,
            });
        }

        warn!("response has neither 'code' nor 'success'; skipping business check");
        Ok(())
    }
}

/// Per-call knobs. Defaults: no query/body/extra headers, expect 200, use
/// the client-level business-check setting.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: BTreeMap<String, String>,
    pub expected_status: Option<u16>,
    pub check_business: Option<bool>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = Some(status);
        self
    }

    pub fn business_check(mut self, enabled: bool) -> Self {
        self.check_business = Some(enabled);
        self
    }
}

/// Merge precedence, highest last applied: defaults < bearer token <
/// per-call headers.
pub fn merge_headers(
    defaults: &BTreeMap<String, String>,
    bearer_token: Option<&str>,
    per_call: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = defaults.clone();
    if let Some(token) = bearer_token {
        merged.insert("Authorization".to_string(), format!("Bearer {token}"));
    }
    for (key, value) in per_call {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    default_headers: BTreeMap<String, String>,
    bearer_token: Option<String>,
    business: BusinessCheck,
    check_by_default: bool,
}

impl ApiClient {
    pub fn new(base_url: impl AsRef<str>, default_headers: BTreeMap<String, String>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(UtaError::Network)?;
        Ok(Self {
            http,
            base_url,
            default_headers,
            bearer_token: None,
            business: BusinessCheck::default(),
            check_by_default: true,
        })
    }

    /// Client configured from `api.*` (base URL falling back to the app's,
    /// JSON content type unless overridden, configured success codes).
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut default_headers = config.api.default_headers.clone();
        default_headers
            .entry("Content-Type".to_string())
            .or_insert_with(|| "application/json;charset=utf-8".to_string());

        let mut client = Self::new(config.api_base_url(), default_headers)?;
        if let Some(codes) = &config.api.success_codes {
            client.business = BusinessCheck::new(codes.clone());
        }
        Ok(client)
    }

    /// All subsequent requests carry `Authorization: Bearer <token>`.
    pub fn set_bearer_token(&mut self, token: impl Into<String>) {
        self.bearer_token = Some(token.into());
        info!("bearer token installed");
    }

    /// Install a long-lived default header.
    pub fn set_default_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        info!(header = %key, "default header installed");
        self.default_headers.insert(key, value);
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Value> {
        self.request(Method::GET, path, options).await
    }

    pub async fn post(&self, path: &str, options: RequestOptions) -> Result<Value> {
        self.request(Method::POST, path, options).await
    }

    pub async fn put(&self, path: &str, options: RequestOptions) -> Result<Value> {
        self.request(Method::PUT, path, options).await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<Value> {
        self.request(Method::DELETE, path, options).await
    }

    fn resolve_url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(UtaError::InvalidUrl);
        }
        self.base_url.join(path).map_err(UtaError::InvalidUrl)
    }

    async fn request(&self, method: Method, path: &str, options: RequestOptions) -> Result<Value> {
        let url = self.resolve_url(path)?;
        let headers = merge_headers(
            &self.default_headers,
            self.bearer_token.as_deref(),
            &options.headers,
        );
        info!(method = %method, url = %url, ?headers, "api request");

        let mut builder = self.http.request(method, url);
        for (key, value) in &headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(UtaError::Network)?;
        self.handle_response(response, &options).await
    }

    /// Status check, JSON parse, then the optional business check; each
    /// stage short-circuits.
    async fn handle_response(
        &self,
        response: reqwest::Response,
        options: &RequestOptions,
    ) -> Result<Value> {
        let expected = options.expected_status.unwrap_or(200);
        let actual = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        if actual != expected {
            return Err(UtaError::HttpStatus {
                expected,
                actual,
                body_preview: truncate_preview(&text),
            });
        }

        let body: Value = serde_json::from_str(&text).map_err(|_| UtaError::ResponseNotJson {
            status: actual,
            body: text.clone(),
        })?;
        info!(body = %body, "api response");

        let check = options.check_business.unwrap_or(self.check_by_default);
        if check {
            self.business.evaluate(&body)?;
        }
        Ok(body)
    }
}

fn truncate_preview(text: &str) -> String {
    if text.chars().count() <= BODY_PREVIEW_LIMIT {
        return text.to_string();
    }
    let preview: String = text.chars().take(BODY_PREVIEW_LIMIT).collect();
    format!("{preview}...(truncated)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn per_call_headers_beat_token_and_defaults() {
        let defaults = headers(&[("Content-Type", "application/json"), ("X-Tenant", "10")]);
        let per_call = headers(&[("X-Tenant", "99"), ("Authorization", "Basic abc")]);
        let merged = merge_headers(&defaults, Some("tok"), &per_call);

        assert_eq!(merged["X-Tenant"], "99");
        assert_eq!(merged["Authorization"], "Basic abc");
        assert_eq!(merged["Content-Type"], "application/json");
    }

    #[test]
    fn bearer_token_injected_when_not_overridden() {
        let merged = merge_headers(&BTreeMap::new(), Some("tok"), &BTreeMap::new());
        assert_eq!(merged["Authorization"], "Bearer tok");
    }

    #[test]
    fn numeric_zero_code_passes() {
        assert!(BusinessCheck::default().evaluate(&json!({"code": 0})).is_ok());
    }

    #[test]
    fn string_zero_and_word_codes_pass() {
        let check = BusinessCheck::default();
        assert!(check.evaluate(&json!({"code": "0"})).is_ok());
        assert!(check.evaluate(&json!({"code": "SUCCESS"})).is_ok());
        assert!(check.evaluate(&json!({"code": "SUCCESSFUL"})).is_ok());
        assert!(check.evaluate(&json!({"code": "OK"})).is_ok());
    }

    #[test]
    fn failing_code_carries_msg() {
        let err = BusinessCheck::default()
            .evaluate(&json!({"code": 1, "msg": "bad"}))
            .unwrap_err();
        match err {
            UtaError::Business { code, message } => {
                assert_eq!(code, "1");
                assert_eq!(message, "bad");
            }
            other => panic!("expected business error, got {other}"),
        }
    }

    #[test]
    fn failing_code_falls_back_to_message_field() {
        let err = BusinessCheck::default()
            .evaluate(&json!({"code": "E42", "message": "broken"}))
            .unwrap_err();
        assert!(format!("{err}").contains("broken"));
    }

    #[test]
    fn success_true_passes_and_false_fails() {
        let check = BusinessCheck::default();
        assert!(check.evaluate(&json!({"success": true})).is_ok());
        assert!(check.evaluate(&json!({"success": false, "message": "no"})).is_err());
    }

    #[test]
    fn success_must_be_literal_true() {
        let check = BusinessCheck::default();
        assert!(check.evaluate(&json!({"success": "true"})).is_err());
        assert!(check.evaluate(&json!({"success": 1})).is_err());
    }

    #[test]
    fn code_field_wins_over_success_field() {
        let err = BusinessCheck::default()
            .evaluate(&json!({"code": 7, "success": true}))
            .unwrap_err();
        assert!(matches!(err, UtaError::Business { .. }));
    }

    #[test]
    fn body_without_envelope_passes() {
        assert!(BusinessCheck::default()
            .evaluate(&json!({"data": {"id": 1}}))
            .is_ok());
    }

    #[test]
    fn custom_success_codes_replace_defaults() {
        let check = BusinessCheck::new(vec!["200".to_string()]);
        assert!(check.evaluate(&json!({"code": "200"})).is_ok());
        assert!(check.evaluate(&json!({"code": 0})).is_err());
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let long = "x".repeat(700);
        let preview = truncate_preview(&long);
        assert!(preview.len() < 600);
        assert!(preview.ends_with("...(truncated)"));
    }

    #[test]
    fn preview_keeps_short_bodies_intact() {
        assert_eq!(truncate_preview("short"), "short");
    }

    #[test]
    fn relative_paths_join_onto_base() {
        let client = ApiClient::new("http://api.example.com/v1/", BTreeMap::new()).unwrap();
        let url = client.resolve_url("users/profile").unwrap();
        assert_eq!(url.as_str(), "http://api.example.com/v1/users/profile");
    }

    #[test]
    fn absolute_urls_are_used_verbatim() {
        let client = ApiClient::new("http://api.example.com", BTreeMap::new()).unwrap();
        let url = client.resolve_url("https://other.example.com/x").unwrap();
        assert_eq!(url.as_str(), "https://other.example.com/x");
    }

    #[test]
    fn request_options_default_expects_200_and_inherits_check() {
        let options = RequestOptions::new();
        assert!(options.expected_status.is_none());
        assert!(options.check_business.is_none());
        assert!(options.query.is_empty());
    }
}
