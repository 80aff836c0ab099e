use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::capture::domain::camera_device::{CameraConfig, CameraDevice, CaptureError};
use crate::shared::constants::{CAPTURE_INTERVAL, READ_RETRY_DELAY, STOP_JOIN_TIMEOUT};
use crate::shared::frame::Frame;
use crate::shared::worker::Worker;

/// What the capture loop does when a frame read fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadErrorPolicy {
    /// Log, wait briefly, keep reading. For devices that drop frames.
    Retry,
    /// Close the device and end the session. For devices that disappear.
    Abort,
}

#[derive(Clone, Debug)]
pub struct FrameSourceConfig {
    pub camera: CameraConfig,
    pub read_error_policy: ReadErrorPolicy,
    pub capture_interval: Duration,
    pub retry_delay: Duration,
    pub stop_timeout: Duration,
}

impl Default for FrameSourceConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            read_error_policy: ReadErrorPolicy::Retry,
            capture_interval: CAPTURE_INTERVAL,
            retry_delay: READ_RETRY_DELAY,
            stop_timeout: STOP_JOIN_TIMEOUT,
        }
    }
}

struct SharedFrame {
    latest: Mutex<Option<Frame>>,
    running: AtomicBool,
}

/// Cloneable read-only handle onto a frame source's latest frame.
///
/// Consumers get a deep copy under a lock held only for the copy itself;
/// reads never wait on camera I/O.
#[derive(Clone)]
pub struct FrameTap {
    shared: Arc<SharedFrame>,
}

impl FrameTap {
    pub fn latest_frame(&self) -> Option<Frame> {
        self.shared.latest.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }
}

/// Owns the camera for a session and keeps the latest-frame slot fresh from
/// a dedicated capture thread.
///
/// The device is opened on `start` (so an absent camera fails fast) and then
/// moved into the worker, which closes it on every exit path.
pub struct FrameSource {
    shared: Arc<SharedFrame>,
    worker: Option<Worker>,
    config: FrameSourceConfig,
}

impl FrameSource {
    pub fn new(config: FrameSourceConfig) -> Self {
        Self {
            shared: Arc::new(SharedFrame {
                latest: Mutex::new(None),
                running: AtomicBool::new(false),
            }),
            worker: None,
            config,
        }
    }

    /// Opens the device and spawns the capture loop.
    ///
    /// Fails without side effects when a session is already running or the
    /// device cannot be opened.
    pub fn start(&mut self, mut device: Box<dyn CameraDevice>) -> Result<(), CaptureError> {
        if self.is_running() {
            return Err(CaptureError::AlreadyRunning);
        }
        device.open(&self.config.camera)?;

        self.shared.running.store(true, Ordering::Relaxed);
        let shared = self.shared.clone();
        let policy = self.config.read_error_policy;
        let capture_interval = self.config.capture_interval;
        let retry_delay = self.config.retry_delay;

        self.worker = Some(Worker::spawn("capture", move || {
            capture_loop(device, shared, policy, capture_interval, retry_delay);
        }));
        log::info!("camera started");
        Ok(())
    }

    /// Signals the loop to end, joins it with a bounded timeout, and clears
    /// the stored frame. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if !worker.join_timeout(self.config.stop_timeout) {
                log::warn!("capture worker did not stop in time; detaching");
            }
        }
        *self.shared.latest.lock() = None;
        log::info!("camera stopped");
    }

    /// Deep copy of the most recent frame, or `None` before the first
    /// successful read (and after `stop`).
    pub fn latest_frame(&self) -> Option<Frame> {
        self.shared.latest.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }

    pub fn tap(&self) -> FrameTap {
        FrameTap {
            shared: self.shared.clone(),
        }
    }
}

fn capture_loop(
    mut device: Box<dyn CameraDevice>,
    shared: Arc<SharedFrame>,
    policy: ReadErrorPolicy,
    capture_interval: Duration,
    retry_delay: Duration,
) {
    while shared.running.load(Ordering::Relaxed) {
        match device.read_frame() {
            Ok(frame) => {
                *shared.latest.lock() = Some(frame);
            }
            Err(e) => match policy {
                ReadErrorPolicy::Retry => {
                    log::warn!("frame read failed, retrying: {e}");
                    thread::sleep(retry_delay);
                    continue;
                }
                ReadErrorPolicy::Abort => {
                    log::warn!("frame read failed, ending capture: {e}");
                    shared.running.store(false, Ordering::Relaxed);
                    break;
                }
            },
        }
        thread::sleep(capture_interval);
    }
    device.close();
}
