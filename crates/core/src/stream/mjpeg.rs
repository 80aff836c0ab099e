//! The video output boundary: annotated frames as an MJPEG multipart
//! sequence, ready for a web layer to serve verbatim.

use std::thread;
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::pipeline::coordinator::SessionCoordinator;
use crate::shared::constants::STREAM_FRAME_INTERVAL;
use crate::shared::frame::Frame;

/// Value for the HTTP Content-Type header of the whole stream.
pub const MULTIPART_MIME: &str = "multipart/x-mixed-replace; boundary=frame";

const BOUNDARY: &str = "frame";
const JPEG_QUALITY: u8 = 80;

pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, image::ImageError> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).write_image(
        frame.data(),
        frame.width(),
        frame.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(jpeg)
}

/// Wraps one JPEG into a multipart part with the stream boundary.
pub fn multipart_chunk(jpeg: &[u8]) -> Vec<u8> {
    let header = format!("--{BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n");
    let mut chunk = Vec::with_capacity(header.len() + jpeg.len() + 2);
    chunk.extend_from_slice(header.as_bytes());
    chunk.extend_from_slice(jpeg);
    chunk.extend_from_slice(b"\r\n");
    chunk
}

/// Paced iterator of multipart chunks from a coordinator.
///
/// Yields while either session is active (idling between polls when no
/// frame is available yet) and terminates once both are inactive, ending
/// the multipart response.
pub struct MjpegStream<'a> {
    coordinator: &'a SessionCoordinator,
    interval: Duration,
}

impl<'a> MjpegStream<'a> {
    pub fn new(coordinator: &'a SessionCoordinator) -> Self {
        Self {
            coordinator,
            interval: STREAM_FRAME_INTERVAL,
        }
    }

    pub fn with_interval(coordinator: &'a SessionCoordinator, interval: Duration) -> Self {
        Self {
            coordinator,
            interval,
        }
    }
}

impl Iterator for MjpegStream<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        loop {
            let status = self.coordinator.status();
            if !status.active && !status.camera_active {
                return None;
            }
            if let Some(frame) = self.coordinator.annotated_frame() {
                match encode_jpeg(&frame) {
                    Ok(jpeg) => {
                        thread::sleep(self.interval);
                        return Some(multipart_chunk(&jpeg));
                    }
                    Err(e) => {
                        log::error!("failed to encode stream frame: {e}");
                        return None;
                    }
                }
            }
            thread::sleep(self.interval);
        }
    }
}
