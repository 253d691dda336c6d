//! Browser automation over the Chrome DevTools Protocol.
//!
//! # Module Structure
//!
//! - [`session`] - session-scoped engine and per-test contexts
//! - [`page`] - page handle with polling interactions and waits
//! - [`storage`] - persisted authentication state snapshots
//! - [`trace`] - action timeline recording and ZIP export
//! - [`har`] - HAR 1.2 network capture
//! - [`video`] - periodic-screenshot GIF capture

pub mod har;
pub mod page;
pub mod session;
pub mod storage;
pub mod trace;
pub mod video;

pub use har::{Har, HarRecorder};
pub use page::{PageHandle, WaitUntil, NETWORK_IDLE_WINDOW, POLL_INTERVAL};
pub use session::{
    BrowserSession, ContextOptions, TestContext, ENV_VAR_RECORD_HAR, ENV_VAR_RECORD_VIDEO,
};
pub use storage::{StorageState, DEFAULT_STORAGE_STATE_PATH};
pub use trace::Tracer;
pub use video::VideoRecorder;
