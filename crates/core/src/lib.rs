//! Camera-based attendance pipeline: frame capture, face location and
//! matching, session coordination, and attendance marking.
//!
//! The web layer is deliberately absent; boundary types (annotated frames,
//! MJPEG chunks, detection and status records) are plain values any server
//! can expose.

pub mod attendance;
pub mod capture;
pub mod pipeline;
pub mod recognition;
pub mod shared;
pub mod stream;
