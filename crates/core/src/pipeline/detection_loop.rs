use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Local;
use parking_lot::Mutex;

use crate::capture::domain::frame_source::FrameTap;
use crate::pipeline::SessionError;
use crate::recognition::domain::detection::Detection;
use crate::recognition::domain::encoder;
use crate::recognition::domain::enrolled_face::EnrolledFace;
use crate::recognition::domain::face_locator::{FaceLocator, LocatorProvider};
use crate::recognition::domain::matcher;
use crate::shared::constants::{
    DEFAULT_DISPLAY_THRESHOLD, DETECTION_CYCLE_INTERVAL, DETECTION_IDLE_DELAY,
    SESSION_STARTUP_TIMEOUT, STOP_JOIN_TIMEOUT,
};
use crate::shared::worker::Worker;

#[derive(Clone, Debug)]
pub struct DetectionConfig {
    /// Fixed delay between cycles; intentionally slower than capture.
    pub cycle_interval: Duration,
    /// Poll delay while no frame has been captured yet.
    pub idle_delay: Duration,
    /// Minimum correlation for a face to be labeled in the published list.
    pub display_threshold: f64,
    pub startup_timeout: Duration,
    pub stop_timeout: Duration,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cycle_interval: DETECTION_CYCLE_INTERVAL,
            idle_delay: DETECTION_IDLE_DELAY,
            display_threshold: DEFAULT_DISPLAY_THRESHOLD,
            startup_timeout: SESSION_STARTUP_TIMEOUT,
            stop_timeout: STOP_JOIN_TIMEOUT,
        }
    }
}

struct SharedDetections {
    latest: Mutex<Vec<Detection>>,
    running: AtomicBool,
}

/// The locate → encode → match worker and its published detection set.
///
/// State machine is `Idle → Running → Idle`; `start` on a running session is
/// a failure, `stop` is idempotent and clears the published set so nothing
/// leaks into a later session. Each cycle replaces the set wholesale; a
/// face absent for one cycle disappears, with no smoothing or decay.
pub struct DetectionSession {
    shared: Arc<SharedDetections>,
    worker: Option<Worker>,
    config: DetectionConfig,
}

impl DetectionSession {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            shared: Arc::new(SharedDetections {
                latest: Mutex::new(Vec::new()),
                running: AtomicBool::new(false),
            }),
            worker: None,
            config,
        }
    }

    /// Spawns the detection cycle against an enrollment snapshot.
    ///
    /// The worker builds its own locator (backends need not be `Send`) and
    /// reports readiness over a channel, so a broken model fails this call
    /// rather than dying silently in the background.
    pub fn start(
        &mut self,
        provider: Arc<dyn LocatorProvider>,
        enrolled: Vec<EnrolledFace>,
        frames: FrameTap,
    ) -> Result<(), SessionError> {
        if self.is_running() {
            return Err(SessionError::RecognitionAlreadyActive);
        }
        if !frames.is_active() {
            return Err(SessionError::CameraInactive);
        }
        if enrolled.is_empty() {
            return Err(SessionError::NoEnrolledFaces);
        }

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);
        self.shared.running.store(true, Ordering::Relaxed);
        let enrolled_count = enrolled.len();

        let shared = self.shared.clone();
        let cycle_interval = self.config.cycle_interval;
        let idle_delay = self.config.idle_delay;
        let display_threshold = self.config.display_threshold;

        let worker = Worker::spawn("detection", move || {
            let mut locator = match provider.create_locator() {
                Ok(locator) => {
                    let _ = ready_tx.send(Ok(()));
                    locator
                }
                Err(e) => {
                    shared.running.store(false, Ordering::Relaxed);
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };
            run_cycles(
                locator.as_mut(),
                &enrolled,
                &frames,
                &shared,
                cycle_interval,
                idle_delay,
                display_threshold,
            );
        });

        match ready_rx.recv_timeout(self.config.startup_timeout) {
            Ok(Ok(())) => {
                self.worker = Some(worker);
                log::info!("face recognition started with {enrolled_count} known faces");
                Ok(())
            }
            Ok(Err(message)) => {
                worker.join_timeout(self.config.stop_timeout);
                Err(SessionError::LocatorInit(message))
            }
            Err(_) => {
                self.shared.running.store(false, Ordering::Relaxed);
                worker.join_timeout(self.config.stop_timeout);
                Err(SessionError::LocatorInit("locator setup timed out".into()))
            }
        }
    }

    /// Ends the cycle, joins with a bounded timeout, and clears the
    /// published detections. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if !worker.join_timeout(self.config.stop_timeout) {
                log::warn!("detection worker did not stop in time; detaching");
            }
        }
        self.shared.latest.lock().clear();
        log::info!("face recognition stopped");
    }

    /// Deep copy of the currently published detection set.
    pub fn detections(&self) -> Vec<Detection> {
        self.shared.latest.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }
}

fn run_cycles(
    locator: &mut dyn FaceLocator,
    enrolled: &[EnrolledFace],
    frames: &FrameTap,
    shared: &SharedDetections,
    cycle_interval: Duration,
    idle_delay: Duration,
    display_threshold: f64,
) {
    while shared.running.load(Ordering::Relaxed) {
        // No frame yet is not an error; the capture loop just has not
        // produced one. Skip the cycle.
        let Some(frame) = frames.latest_frame() else {
            thread::sleep(idle_delay);
            continue;
        };

        let regions = locator.locate(&frame);
        let detections = if regions.is_empty() {
            Vec::new()
        } else {
            let gray = encoder::grayscale(&frame);
            let now = Local::now();
            let mut found = Vec::with_capacity(regions.len());
            for region in regions {
                let Some(encoding) = encoder::encode_gray_region(&gray, &region) else {
                    continue;
                };
                let outcome = matcher::best_match(&encoding, enrolled, display_threshold);
                found.push(Detection {
                    student_id: outcome.student_id,
                    display_name: outcome.display_name,
                    confidence: outcome.confidence,
                    region,
                    timestamp: now,
                });
            }
            found
        };

        log::debug!("detection cycle published {} faces", detections.len());
        *shared.latest.lock() = detections;
        thread::sleep(cycle_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::camera_device::{CameraConfig, CameraDevice, CaptureError};
    use crate::capture::domain::frame_source::{FrameSource, FrameSourceConfig, ReadErrorPolicy};
    use crate::recognition::domain::encoder::Encoding;
    use crate::recognition::domain::face_locator::RecognitionError;
    use crate::shared::frame::Frame;
    use crate::shared::region::FaceRegion;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    /// Serves the same frame forever.
    struct StaticCamera {
        frame: Frame,
    }

    impl CameraDevice for StaticCamera {
        fn open(&mut self, _config: &CameraConfig) -> Result<(), CaptureError> {
            Ok(())
        }
        fn read_frame(&mut self) -> Result<Frame, CaptureError> {
            Ok(self.frame.clone())
        }
        fn close(&mut self) {}
        fn is_open(&self) -> bool {
            true
        }
    }

    /// Returns fixed regions and counts invocations.
    struct FixedLocator {
        regions: Vec<FaceRegion>,
        calls: Arc<AtomicUsize>,
    }

    impl FaceLocator for FixedLocator {
        fn locate(&mut self, _frame: &Frame) -> Vec<FaceRegion> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.regions.clone()
        }
    }

    struct FixedProvider {
        regions: Vec<FaceRegion>,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl FixedProvider {
        fn with_regions(regions: Vec<FaceRegion>) -> (Arc<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider = Arc::new(Self {
                regions,
                calls: calls.clone(),
                fail: false,
            });
            (provider, calls)
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                regions: vec![],
                calls: Arc::new(AtomicUsize::new(0)),
                fail: true,
            })
        }
    }

    impl LocatorProvider for FixedProvider {
        fn create_locator(&self) -> Result<Box<dyn FaceLocator>, RecognitionError> {
            if self.fail {
                return Err(RecognitionError::LocatorInit("broken model".into()));
            }
            Ok(Box::new(FixedLocator {
                regions: self.regions.clone(),
                calls: self.calls.clone(),
            }))
        }
    }

    /// A frame with enough variance for a meaningful correlation.
    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 7 + y * 13) % 256) as u8;
                data.extend_from_slice(&[v, v, v]);
            }
        }
        Frame::new(data, width, height)
    }

    fn fast_config() -> DetectionConfig {
        DetectionConfig {
            cycle_interval: Duration::from_millis(1),
            idle_delay: Duration::from_millis(1),
            ..DetectionConfig::default()
        }
    }

    fn running_source(frame: Frame) -> FrameSource {
        let mut source = FrameSource::new(FrameSourceConfig {
            capture_interval: Duration::from_millis(1),
            read_error_policy: ReadErrorPolicy::Retry,
            ..FrameSourceConfig::default()
        });
        source.start(Box::new(StaticCamera { frame })).unwrap();
        source
    }

    fn enrolled_from(frame: &Frame, region: &FaceRegion, id: i64, name: &str) -> EnrolledFace {
        let encoding = encoder::encode_region(frame, region).unwrap();
        EnrolledFace::new(id, name, encoding)
    }

    fn some_enrollment() -> Vec<EnrolledFace> {
        vec![EnrolledFace::new(
            1,
            "Anyone",
            Encoding::new(vec![1.0, 2.0, 3.0]),
        )]
    }

    fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_start_requires_active_camera() {
        let source = FrameSource::new(FrameSourceConfig::default());
        let (provider, _) = FixedProvider::with_regions(vec![]);
        let mut session = DetectionSession::new(fast_config());
        let result = session.start(provider, some_enrollment(), source.tap());
        assert!(matches!(result, Err(SessionError::CameraInactive)));
        assert!(!session.is_running());
    }

    #[test]
    fn test_start_requires_enrollment() {
        let mut source = running_source(gradient_frame(32, 32));
        let (provider, _) = FixedProvider::with_regions(vec![]);
        let mut session = DetectionSession::new(fast_config());
        let result = session.start(provider, vec![], source.tap());
        assert!(matches!(result, Err(SessionError::NoEnrolledFaces)));
        source.stop();
    }

    #[test]
    fn test_locator_init_failure_fails_start() {
        let mut source = running_source(gradient_frame(32, 32));
        let mut session = DetectionSession::new(fast_config());
        let result = session.start(FixedProvider::failing(), some_enrollment(), source.tap());
        assert!(matches!(result, Err(SessionError::LocatorInit(_))));
        assert!(!session.is_running());
        source.stop();
    }

    #[test]
    fn test_second_start_fails() {
        let mut source = running_source(gradient_frame(32, 32));
        let (provider, _) = FixedProvider::with_regions(vec![]);
        let mut session = DetectionSession::new(fast_config());
        session
            .start(provider.clone(), some_enrollment(), source.tap())
            .unwrap();

        let result = session.start(provider, some_enrollment(), source.tap());
        assert!(matches!(result, Err(SessionError::RecognitionAlreadyActive)));

        session.stop();
        source.stop();
    }

    #[test]
    fn test_no_faces_publishes_empty_set() {
        let mut source = running_source(gradient_frame(32, 32));
        let (provider, calls) = FixedProvider::with_regions(vec![]);
        let mut session = DetectionSession::new(fast_config());
        session
            .start(provider, some_enrollment(), source.tap())
            .unwrap();

        // At least one full cycle has run; the published set stays empty.
        assert!(wait_until(Duration::from_secs(2), || calls
            .load(Ordering::Relaxed)
            >= 2));
        assert!(session.detections().is_empty());

        session.stop();
        source.stop();
    }

    #[test]
    fn test_matching_face_is_published_with_identity() {
        let frame = gradient_frame(64, 64);
        let region = FaceRegion::new(4, 4, 40, 40);
        let enrolled = vec![enrolled_from(&frame, &region, 17, "Priya Shah")];

        let mut source = running_source(frame);
        let (provider, _) = FixedProvider::with_regions(vec![region]);
        let mut session = DetectionSession::new(fast_config());
        session.start(provider, enrolled, source.tap()).unwrap();

        assert!(wait_until(Duration::from_secs(2), || !session
            .detections()
            .is_empty()));
        let detections = session.detections();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].student_id, Some(17));
        assert_eq!(detections[0].display_name, "Priya Shah");
        assert!(detections[0].confidence > 0.99);
        assert_eq!(detections[0].region, region);

        session.stop();
        source.stop();
    }

    #[test]
    fn test_non_matching_face_is_published_as_unknown() {
        let frame = gradient_frame(64, 64);
        let region = FaceRegion::new(4, 4, 40, 40);
        // Enrolled against a very different patch of a different frame.
        let other = Frame::new(vec![0; 64 * 64 * 3], 64, 64);
        let enrolled = vec![EnrolledFace::new(
            5,
            "Noah Lim",
            encoder::encode_region(&other, &region).unwrap_or(Encoding::new(vec![0.0; 4])),
        )];

        let mut source = running_source(frame);
        let (provider, _) = FixedProvider::with_regions(vec![region]);
        let mut session = DetectionSession::new(fast_config());
        session.start(provider, enrolled, source.tap()).unwrap();

        assert!(wait_until(Duration::from_secs(2), || !session
            .detections()
            .is_empty()));
        let detections = session.detections();
        assert_eq!(detections[0].student_id, None);
        assert_eq!(detections[0].display_name, matcher::UNKNOWN_LABEL);
        assert_eq!(detections[0].confidence, 0.0);

        session.stop();
        source.stop();
    }

    #[test]
    fn test_stop_clears_detections_and_is_idempotent() {
        let frame = gradient_frame(64, 64);
        let region = FaceRegion::new(4, 4, 40, 40);
        let enrolled = vec![enrolled_from(&frame, &region, 2, "Maya Ortiz")];

        let mut source = running_source(frame);
        let (provider, _) = FixedProvider::with_regions(vec![region]);
        let mut session = DetectionSession::new(fast_config());
        session.start(provider, enrolled, source.tap()).unwrap();
        assert!(wait_until(Duration::from_secs(2), || !session
            .detections()
            .is_empty()));

        session.stop();
        assert!(!session.is_running());
        assert!(session.detections().is_empty());

        session.stop();
        assert!(session.detections().is_empty());
        source.stop();
    }

    #[test]
    fn test_restart_begins_with_clean_state() {
        let frame = gradient_frame(64, 64);
        let region = FaceRegion::new(4, 4, 40, 40);
        let enrolled = vec![enrolled_from(&frame, &region, 3, "Leo Park")];

        let mut source = running_source(frame);
        let (provider, _) = FixedProvider::with_regions(vec![region]);
        let mut session = DetectionSession::new(fast_config());
        session
            .start(provider, enrolled.clone(), source.tap())
            .unwrap();
        assert!(wait_until(Duration::from_secs(2), || !session
            .detections()
            .is_empty()));
        session.stop();

        // Second session with a locator that finds nothing: the old
        // detections must not resurface.
        let (empty_provider, calls) = FixedProvider::with_regions(vec![]);
        session
            .start(empty_provider, enrolled, source.tap())
            .unwrap();
        assert!(wait_until(Duration::from_secs(2), || calls
            .load(Ordering::Relaxed)
            >= 2));
        assert!(session.detections().is_empty());

        session.stop();
        source.stop();
    }
}
