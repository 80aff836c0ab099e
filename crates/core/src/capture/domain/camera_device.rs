use thiserror::Error;

use crate::shared::constants::{DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_RATE, DEFAULT_FRAME_WIDTH};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("frame read failed: {0}")]
    ReadFailed(String),
    #[error("capture already running")]
    AlreadyRunning,
}

/// Requested device settings; drivers may deliver a different resolution,
/// and the pipeline works with whatever arrives.
#[derive(Clone, Copy, Debug)]
pub struct CameraConfig {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

/// Domain interface for a live frame device.
///
/// The capture worker owns the device for the lifetime of a session and is
/// responsible for closing it on every exit path.
pub trait CameraDevice: Send {
    fn open(&mut self, config: &CameraConfig) -> Result<(), CaptureError>;
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;
    fn close(&mut self);
    fn is_open(&self) -> bool;
}
