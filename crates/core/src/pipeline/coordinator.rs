use serde::{Deserialize, Serialize};

use crate::capture::domain::camera_device::{CameraDevice, CaptureError};
use crate::capture::domain::frame_source::{FrameSource, FrameSourceConfig};
use crate::pipeline::annotator;
use crate::pipeline::detection_loop::{DetectionConfig, DetectionSession};
use crate::pipeline::SessionError;
use crate::recognition::domain::detection::{Detection, DetectionRecord};
use crate::recognition::domain::enrolled_face::EnrolledFace;
use crate::recognition::domain::face_locator::RecognitionCapability;
use crate::shared::frame::Frame;

/// Builds a fresh device per camera session; devices are consumed by the
/// capture worker and die with it.
pub type CameraFactory = Box<dyn Fn() -> Box<dyn CameraDevice> + Send>;

/// Snapshot of session state for the status boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Face recognition capability resolved at startup.
    pub available: bool,
    /// A detection session is running.
    pub active: bool,
    /// A camera session is running.
    pub camera_active: bool,
}

/// Single owner of the camera and detection sessions.
///
/// Request handlers hold this instead of consulting process-wide flags; all
/// state transitions and all boundary reads (frames, detections, status) go
/// through here.
pub struct SessionCoordinator {
    frames: FrameSource,
    detection: DetectionSession,
    camera_factory: CameraFactory,
    capability: RecognitionCapability,
}

impl SessionCoordinator {
    pub fn new(
        camera_factory: CameraFactory,
        capability: RecognitionCapability,
        frame_config: FrameSourceConfig,
        detection_config: DetectionConfig,
    ) -> Self {
        Self {
            frames: FrameSource::new(frame_config),
            detection: DetectionSession::new(detection_config),
            camera_factory,
            capability,
        }
    }

    /// Starts the plain camera session. Starting twice is a failure, not a
    /// restart.
    pub fn start_camera(&mut self) -> Result<(), SessionError> {
        let device = (self.camera_factory)();
        self.frames.start(device).map_err(|e| match e {
            CaptureError::AlreadyRunning => SessionError::CameraAlreadyActive,
            other => SessionError::CameraUnavailable(other.to_string()),
        })
    }

    pub fn stop_camera(&mut self) {
        self.frames.stop();
    }

    /// Starts face recognition against an enrollment snapshot.
    ///
    /// Requires the capability resolved at startup and an active camera.
    pub fn start_recognition(&mut self, enrolled: Vec<EnrolledFace>) -> Result<(), SessionError> {
        let provider = match &self.capability {
            RecognitionCapability::Available(provider) => provider.clone(),
            RecognitionCapability::Unavailable { reason } => {
                return Err(SessionError::RecognitionUnavailable(reason.clone()));
            }
        };
        self.detection.start(provider, enrolled, self.frames.tap())
    }

    pub fn stop_recognition(&mut self) {
        self.detection.stop();
    }

    /// Stops both sessions; each stop is idempotent.
    pub fn shutdown(&mut self) {
        self.detection.stop();
        self.frames.stop();
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            available: self.capability.is_available(),
            active: self.detection.is_running(),
            camera_active: self.frames.is_running(),
        }
    }

    pub fn detections(&self) -> Vec<Detection> {
        self.detection.detections()
    }

    /// Current detections shaped for the query boundary.
    pub fn detection_report(&self) -> Vec<DetectionRecord> {
        self.detection
            .detections()
            .iter()
            .map(Detection::to_record)
            .collect()
    }

    /// The frame a display consumer should show right now: annotated while
    /// recognition runs, plain while only the camera runs, `None` otherwise.
    pub fn annotated_frame(&self) -> Option<Frame> {
        let frame = self.frames.latest_frame()?;
        if self.detection.is_running() {
            Some(annotator::annotate(&frame, &self.detection.detections()))
        } else {
            Some(frame)
        }
    }
}
