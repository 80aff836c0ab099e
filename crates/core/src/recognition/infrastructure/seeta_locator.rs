use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustface::ImageData;

use crate::recognition::domain::encoder;
use crate::recognition::domain::face_locator::{
    FaceLocator, LocatorConfig, LocatorProvider, RecognitionCapability, RecognitionError,
};
use crate::recognition::infrastructure::model_resolver::{self, ProgressFn};
use crate::shared::constants::{SEETA_MODEL_NAME, SEETA_MODEL_URL};
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Face locator over the SeetaFace funnel-structured cascade.
///
/// Deterministic for a given frame and configuration; regions come back in
/// scan order, which callers must not rely on.
pub struct SeetaLocator {
    detector: Box<dyn rustface::Detector>,
}

impl SeetaLocator {
    pub fn from_model_path(path: &Path, config: &LocatorConfig) -> Result<Self, RecognitionError> {
        let mut detector = rustface::create_detector(path.to_string_lossy().as_ref())
            .map_err(|e| RecognitionError::LocatorInit(e.to_string()))?;
        detector.set_min_face_size(config.min_face_size);
        detector.set_score_thresh(config.score_threshold);
        detector.set_pyramid_scale_factor(config.pyramid_scale_factor);
        detector.set_slide_window_step(config.slide_window_step, config.slide_window_step);
        Ok(Self { detector })
    }
}

impl FaceLocator for SeetaLocator {
    fn locate(&mut self, frame: &Frame) -> Vec<FaceRegion> {
        let (luma, _) = encoder::grayscale(frame).into_raw_vec_and_offset();
        let mut image = ImageData::new(&luma, frame.width(), frame.height());

        self.detector
            .detect(&mut image)
            .into_iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                FaceRegion::new(
                    bbox.x(),
                    bbox.y(),
                    bbox.width() as i32,
                    bbox.height() as i32,
                )
                .clamped(frame.width(), frame.height())
            })
            .collect()
    }
}

/// Creates [`SeetaLocator`]s from a resolved model file.
///
/// The detector itself is built per session inside the detection worker; the
/// provider only carries the model path and configuration across threads.
pub struct SeetaLocatorProvider {
    model_path: PathBuf,
    config: LocatorConfig,
}

impl SeetaLocatorProvider {
    /// Resolves the detection model (cache or download) and probes it once,
    /// so a missing or corrupt model surfaces at startup rather than at the
    /// first session start.
    pub fn resolve(
        config: LocatorConfig,
        progress: Option<ProgressFn>,
    ) -> Result<Self, RecognitionError> {
        let model_path = model_resolver::resolve(SEETA_MODEL_NAME, SEETA_MODEL_URL, progress)
            .map_err(|e| RecognitionError::ModelUnavailable(e.to_string()))?;
        Self::from_model_path(model_path, config)
    }

    pub fn from_model_path(
        model_path: PathBuf,
        config: LocatorConfig,
    ) -> Result<Self, RecognitionError> {
        SeetaLocator::from_model_path(&model_path, &config)?;
        Ok(Self { model_path, config })
    }
}

impl LocatorProvider for SeetaLocatorProvider {
    fn create_locator(&self) -> Result<Box<dyn FaceLocator>, RecognitionError> {
        SeetaLocator::from_model_path(&self.model_path, &self.config)
            .map(|locator| Box::new(locator) as Box<dyn FaceLocator>)
    }
}

/// Startup capability resolution: recognition is available exactly when the
/// model resolves and loads. Failures degrade the process to camera-only
/// operation instead of aborting it.
pub fn resolve_capability(
    config: LocatorConfig,
    progress: Option<ProgressFn>,
) -> RecognitionCapability {
    match SeetaLocatorProvider::resolve(config, progress) {
        Ok(provider) => RecognitionCapability::Available(Arc::new(provider)),
        Err(e) => {
            log::warn!("face recognition not available: {e}");
            RecognitionCapability::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}
