//! HAR (HTTP Archive) capture for a test's page.
//!
//! A reduced HAR 1.2 document: request method/url/headers, response
//! status/headers/mime type, and coarse timings. The recorder subscribes to
//! CDP network events when the context opts in (`UI_RECORD_HAR`) and the
//! file is written at context teardown.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventRequestWillBeSent, EventResponseReceived,
};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Result;

pub const HAR_VERSION: &str = "1.2";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Har {
    pub log: HarLog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarLog {
    pub version: String,
    pub creator: HarCreator,
    pub entries: Vec<HarEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarCreator {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarEntry {
    pub started_date_time: String,
    /// Total request time in milliseconds.
    pub time: f64,
    pub request: HarRequest,
    pub response: HarResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarRequest {
    pub method: String,
    pub url: String,
    pub http_version: String,
    pub headers: Vec<HarHeader>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarResponse {
    pub status: i64,
    pub status_text: String,
    pub http_version: String,
    pub headers: Vec<HarHeader>,
    pub content: HarContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarContent {
    pub mime_type: String,
}

impl Har {
    pub fn new() -> Self {
        Self {
            log: HarLog {
                version: HAR_VERSION.to_string(),
                creator: HarCreator {
                    name: env!("CARGO_PKG_NAME").to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                },
                entries: Vec::new(),
            },
        }
    }

    pub fn entry_count(&self) -> usize {
        self.log.entries.len()
    }
}

impl Default for Har {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
struct PendingRequest {
    started_date_time: String,
    started_monotonic: f64,
    method: String,
    url: String,
    headers: Vec<HarHeader>,
}

#[derive(Debug, Default)]
struct HarState {
    pending: HashMap<String, PendingRequest>,
    entries: Vec<HarEntry>,
}

impl HarState {
    fn record_request(
        &mut self,
        id: String,
        method: String,
        url: String,
        headers: Vec<HarHeader>,
        wall_time_secs: f64,
        monotonic_secs: f64,
    ) {
        let started_date_time = chrono::DateTime::from_timestamp(
            wall_time_secs as i64,
            ((wall_time_secs.fract()) * 1e9) as u32,
        )
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();

        self.pending.insert(
            id,
            PendingRequest {
                started_date_time,
                started_monotonic: monotonic_secs,
                method,
                url,
                headers,
            },
        );
    }

    fn record_response(
        &mut self,
        id: &str,
        status: i64,
        status_text: String,
        mime_type: String,
        headers: Vec<HarHeader>,
        monotonic_secs: f64,
    ) {
        let Some(request) = self.pending.remove(id) else {
            return;
        };
        let time = ((monotonic_secs - request.started_monotonic) * 1000.0).max(0.0);
        self.entries.push(HarEntry {
            started_date_time: request.started_date_time,
            time,
            request: HarRequest {
                method: request.method,
                url: request.url,
                http_version: "HTTP/1.1".to_string(),
                headers: request.headers,
            },
            response: HarResponse {
                status,
                status_text,
                http_version: "HTTP/1.1".to_string(),
                headers,
                content: HarContent { mime_type },
            },
        });
    }

    fn to_har(&self) -> Har {
        let mut har = Har::new();
        har.log.entries = self.entries.clone();
        har
    }
}

fn headers_from_value(value: &serde_json::Value) -> Vec<HarHeader> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(name, value)| HarHeader {
                    name: name.clone(),
                    value: value.as_str().unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Records network traffic for one page.
#[derive(Debug)]
pub struct HarRecorder {
    state: Arc<Mutex<HarState>>,
    tasks: Vec<JoinHandle<()>>,
}

impl HarRecorder {
    /// Enable the network domain and start collecting events.
    pub async fn start(page: &Page) -> Result<Self> {
        page.execute(EnableParams::default()).await?;
        let state = Arc::new(Mutex::new(HarState::default()));

        let mut requests = page.event_listener::<EventRequestWillBeSent>().await?;
        let request_state = Arc::clone(&state);
        let request_task = tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                let headers = headers_from_value(event.request.headers.inner());
                let mut state = request_state.lock().expect("har lock poisoned");
                state.record_request(
                    event.request_id.inner().clone(),
                    event.request.method.clone(),
                    event.request.url.clone(),
                    headers,
                    *event.wall_time.inner(),
                    *event.timestamp.inner(),
                );
            }
        });

        let mut responses = page.event_listener::<EventResponseReceived>().await?;
        let response_state = Arc::clone(&state);
        let response_task = tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                let headers = headers_from_value(event.response.headers.inner());
                let mut state = response_state.lock().expect("har lock poisoned");
                state.record_response(
                    event.request_id.inner().as_str(),
                    event.response.status,
                    event.response.status_text.clone(),
                    event.response.mime_type.clone(),
                    headers,
                    *event.timestamp.inner(),
                );
            }
        });

        Ok(Self {
            state,
            tasks: vec![request_task, response_task],
        })
    }

    /// Stop collecting and write the archive. Requests that never saw a
    /// response are dropped.
    pub fn write(&mut self, path: &Path) -> Result<PathBuf> {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        let har = self.state.lock().expect("har lock poisoned").to_har();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(&har)?)?;
        debug!(path = %path.display(), entries = har.entry_count(), "HAR written");
        Ok(path.to_path_buf())
    }

    /// Teardown helper: write if possible, otherwise log and move on.
    pub fn write_best_effort(&mut self, path: &Path) {
        if let Err(e) = self.write(path) {
            warn!("HAR capture failed: {e}");
        }
    }
}

impl Drop for HarRecorder {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}
