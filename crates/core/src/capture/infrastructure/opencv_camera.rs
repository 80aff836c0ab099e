use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{imgproc, videoio};

use crate::capture::domain::camera_device::{CameraConfig, CameraDevice, CaptureError};
use crate::shared::frame::Frame;

/// Webcam backend over OpenCV's `VideoCapture`.
///
/// OpenCV delivers BGR; conversion to the pipeline's RGB happens here so the
/// domain layer never sees device color order.
pub struct OpencvCamera {
    capture: Option<videoio::VideoCapture>,
}

impl OpencvCamera {
    pub fn new() -> Self {
        Self { capture: None }
    }
}

impl Default for OpencvCamera {
    fn default() -> Self {
        Self::new()
    }
}

fn device_err(e: opencv::Error) -> CaptureError {
    CaptureError::DeviceUnavailable(e.to_string())
}

fn read_err(e: opencv::Error) -> CaptureError {
    CaptureError::ReadFailed(e.to_string())
}

impl CameraDevice for OpencvCamera {
    fn open(&mut self, config: &CameraConfig) -> Result<(), CaptureError> {
        let mut capture = videoio::VideoCapture::new(config.index as i32, videoio::CAP_ANY)
            .map_err(device_err)?;
        if !capture.is_opened().map_err(device_err)? {
            return Err(CaptureError::DeviceUnavailable(format!(
                "cannot open camera {}",
                config.index
            )));
        }

        // Best-effort; drivers are free to ignore these.
        let _ = capture.set(videoio::CAP_PROP_FRAME_WIDTH, config.width as f64);
        let _ = capture.set(videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64);
        let _ = capture.set(videoio::CAP_PROP_FPS, config.frame_rate as f64);

        self.capture = Some(capture);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| CaptureError::ReadFailed("camera not open".into()))?;

        let mut bgr = Mat::default();
        let grabbed = capture.read(&mut bgr).map_err(read_err)?;
        if !grabbed || bgr.empty() {
            return Err(CaptureError::ReadFailed("empty frame from device".into()));
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color_def(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB).map_err(read_err)?;

        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let data = rgb.data_bytes().map_err(read_err)?.to_vec();
        Ok(Frame::new(data, width, height))
    }

    fn close(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            let _ = capture.release();
        }
    }

    fn is_open(&self) -> bool {
        self.capture
            .as_ref()
            .map(|c| c.is_opened().unwrap_or(false))
            .unwrap_or(false)
    }
}
