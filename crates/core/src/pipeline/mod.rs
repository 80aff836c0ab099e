pub mod annotator;
pub mod coordinator;
pub mod detection_loop;

use thiserror::Error;

/// Session-level failures surfaced at the control boundary. None of these is
/// fatal to the process.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("camera already active")]
    CameraAlreadyActive,
    #[error("face recognition already active")]
    RecognitionAlreadyActive,
    #[error("failed to start camera: {0}")]
    CameraUnavailable(String),
    #[error("camera is not active")]
    CameraInactive,
    #[error("no enrolled faces with usable encodings")]
    NoEnrolledFaces,
    #[error("face recognition not available: {0}")]
    RecognitionUnavailable(String),
    #[error("failed to initialize face locator: {0}")]
    LocatorInit(String),
}
