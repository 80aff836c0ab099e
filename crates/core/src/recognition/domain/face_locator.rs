use std::sync::Arc;

use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("face detection model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("failed to initialize face locator: {0}")]
    LocatorInit(String),
}

/// Cascade-style detector knobs. Fixed per deployment, but surfaced here so
/// they are tunable without code changes.
#[derive(Clone, Copy, Debug)]
pub struct LocatorConfig {
    /// Smallest face side (pixels) the scan considers.
    pub min_face_size: u32,
    /// Classifier score a window must reach to count as a face.
    pub score_threshold: f64,
    /// Shrink factor between pyramid levels.
    pub pyramid_scale_factor: f32,
    /// Sliding-window step, applied on both axes.
    pub slide_window_step: u32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            min_face_size: 20,
            score_threshold: 2.0,
            pyramid_scale_factor: 0.8,
            slide_window_step: 4,
        }
    }
}

/// Domain interface for finding face regions in a frame.
///
/// Finding nothing is an empty vec, never an error, and callers must treat
/// the output as unordered. Implementations may keep scan buffers, hence
/// `&mut self`.
pub trait FaceLocator {
    fn locate(&mut self, frame: &Frame) -> Vec<FaceRegion>;
}

/// Creates locator instances.
///
/// Detector backends are not required to be `Send`, so the detection worker
/// constructs its own locator from a shareable provider instead of receiving
/// one across the thread boundary.
pub trait LocatorProvider: Send + Sync {
    fn create_locator(&self) -> Result<Box<dyn FaceLocator>, RecognitionError>;
}

/// Whether face recognition is usable in this process, decided once at
/// startup. Every dependent operation checks this value and reports the same
/// failure instead of re-probing per call.
#[derive(Clone)]
pub enum RecognitionCapability {
    Available(Arc<dyn LocatorProvider>),
    Unavailable { reason: String },
}

impl RecognitionCapability {
    pub fn is_available(&self) -> bool {
        matches!(self, RecognitionCapability::Available(_))
    }

    pub fn provider(&self) -> Option<&Arc<dyn LocatorProvider>> {
        match self {
            RecognitionCapability::Available(provider) => Some(provider),
            RecognitionCapability::Unavailable { .. } => None,
        }
    }
}
