//! Optional per-test video capture.
//!
//! Samples the page at a fixed interval and encodes the frames as an
//! animated GIF at teardown. Capture is best-effort end to end: a failed
//! frame or a failed encode degrades the video, never the test.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chromiumoxide::Page;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::browser::page::capture_png;
use crate::error::{Result, UtaError};

/// Default sampling interval between frames.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct VideoRecorder {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl VideoRecorder {
    /// Start sampling the page.
    pub fn start(page: Page, interval: Duration) -> Self {
        let frames: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&frames);
        let task = tokio::spawn(async move {
            loop {
                match capture_png(&page).await {
                    Ok(bytes) => sink.lock().expect("video lock poisoned").push(bytes),
                    Err(e) => debug!("video frame skipped: {e}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
        Self {
            frames,
            interval,
            task: Some(task),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().expect("video lock poisoned").len()
    }

    /// Stop sampling and encode the collected frames to `path`.
    pub fn stop_and_write(&mut self, path: &Path) -> Result<PathBuf> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let frames = std::mem::take(&mut *self.frames.lock().expect("video lock poisoned"));
        if frames.is_empty() {
            return Err(UtaError::browser("no video frames captured"));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        encode_gif(&frames, self.interval, path)?;
        debug!(path = %path.display(), frames = frames.len(), "video written");
        Ok(path.to_path_buf())
    }

    /// Teardown helper: encode if possible, otherwise log and move on.
    pub fn stop_best_effort(&mut self, path: &Path) {
        if let Err(e) = self.stop_and_write(path) {
            warn!("video capture failed: {e}");
        }
    }
}

impl Drop for VideoRecorder {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Encode PNG frames as an animated GIF. Frames whose dimensions differ
/// from the first are skipped (the window was resized mid-test).
fn encode_gif(frames: &[Vec<u8>], interval: Duration, path: &Path) -> Result<()> {
    let first = image::load_from_memory(&frames[0])?.to_rgba8();
    let (width, height) = first.dimensions();
    let (width, height) = (width.min(u16::MAX as u32) as u16, height.min(u16::MAX as u32) as u16);

    let file = std::fs::File::create(path)?;
    let mut encoder = gif::Encoder::new(file, width, height, &[])
        .map_err(|e| UtaError::browser(format!("gif encoder: {e}")))?;
    encoder
        .set_repeat(gif::Repeat::Infinite)
        .map_err(|e| UtaError::browser(format!("gif encoder: {e}")))?;

    // GIF delays are hundredths of a second.
    let delay = (interval.as_millis() / 10).clamp(2, u16::MAX as u128) as u16;

    for png in frames {
        let rgba = match image::load_from_memory(png) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                debug!("skipping undecodable frame: {e}");
                continue;
            }
        };
        if rgba.dimensions() != (width as u32, height as u32) {
            debug!("skipping frame with mismatched dimensions");
            continue;
        }
        let mut raw = rgba.into_raw();
        let mut frame = gif::Frame::from_rgba_speed(width, height, &mut raw, 10);
        frame.delay = delay;
        encoder
            .write_frame(&frame)
            .map_err(|e| UtaError::browser(format!("gif frame: {e}")))?;
    }
    Ok(())
}
