//! Persisted authentication state.
//!
//! A JSON snapshot of cookies and per-origin localStorage, produced by the
//! one-shot `generate-storage-state` tool after a real login and loaded
//! into fresh contexts so tests can start authenticated.

use std::path::Path;

use chromiumoxide::cdp::browser_protocol::network::{CookieParam, TimeSinceEpoch};
use chromiumoxide::Page;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, UtaError};

/// Default location of the snapshot, shared by generator and consumer.
pub const DEFAULT_STORAGE_STATE_PATH: &str = "artifacts/storage_state.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
    #[serde(default)]
    pub origins: Vec<OriginState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Seconds since epoch; negative for session cookies.
    #[serde(default)]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<StorageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub value: String,
}

impl StorageState {
    /// Snapshot the page's cookies and the current origin's localStorage.
    pub async fn capture(page: &Page) -> Result<Self> {
        let cookies = page
            .get_cookies()
            .await?
            .into_iter()
            .map(|cookie| StoredCookie {
                name: cookie.name,
                value: cookie.value,
                domain: cookie.domain,
                path: cookie.path,
                expires: cookie.expires,
                http_only: cookie.http_only,
                secure: cookie.secure,
            })
            .collect();

        let origin = page
            .evaluate("window.location.origin")
            .await?
            .into_value::<String>()
            .unwrap_or_default();

        let entries: Value = page
            .evaluate(
                "(() => { const out = {}; for (let i = 0; i < localStorage.length; i++) { \
                 const key = localStorage.key(i); out[key] = localStorage.getItem(key); } \
                 return out; })()",
            )
            .await?
            .into_value()
            .unwrap_or(Value::Null);

        let local_storage: Vec<StorageEntry> = entries
            .as_object()
            .map(|map| {
                map.iter()
                    .map(|(name, value)| StorageEntry {
                        name: name.clone(),
                        value: value.as_str().unwrap_or_default().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let origins = if origin.is_empty() && local_storage.is_empty() {
            Vec::new()
        } else {
            vec![OriginState {
                origin,
                local_storage,
            }]
        };

        Ok(Self { cookies, origins })
    }

    /// Replay the snapshot into a fresh page: install cookies, then visit
    /// each origin to seed its localStorage.
    pub async fn apply(&self, page: &Page) -> Result<()> {
        if !self.cookies.is_empty() {
            let params = self
                .cookies
                .iter()
                .map(|cookie| {
                    let mut builder = CookieParam::builder()
                        .name(cookie.name.clone())
                        .value(cookie.value.clone())
                        .domain(cookie.domain.clone())
                        .path(cookie.path.clone())
                        .http_only(cookie.http_only)
                        .secure(cookie.secure);
                    if cookie.expires > 0.0 {
                        builder = builder.expires(TimeSinceEpoch::new(cookie.expires));
                    }
                    builder
                        .build()
                        .map_err(|e| UtaError::browser(format!("invalid stored cookie: {e}")))
                })
                .collect::<Result<Vec<_>>>()?;
            page.set_cookies(params).await?;
        }

        for origin in &self.origins {
            if origin.local_storage.is_empty() {
                continue;
            }
            page.goto(origin.origin.as_str()).await?;
            for entry in &origin.local_storage {
                let script = format!(
                    "localStorage.setItem({}, {})",
                    serde_json::to_string(&entry.name)?,
                    serde_json::to_string(&entry.value)?
                );
                page.evaluate(script).await?;
            }
            debug!(origin = %origin.origin, entries = origin.local_storage.len(), "localStorage seeded");
        }
        Ok(())
    }

    /// Load the snapshot; a missing file is fatal with a regeneration hint.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(UtaError::config(format!(
                "storage state file not found: {}",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        info!(path = %path.display(), cookies = self.cookies.len(), "storage state saved");
        Ok(())
    }
}
