use std::time::Duration;

pub const SEETA_MODEL_NAME: &str = "seeta_fd_frontal_v1.0.bin";
pub const SEETA_MODEL_URL: &str =
    "https://github.com/atomashpolskiy/rustface/raw/master/model/seeta_fd_frontal_v1.0.bin";

/// Side length of the canonical square face patch; encodings are the
/// flattened patch, so their length is the square of this.
pub const CANONICAL_PATCH_SIZE: u32 = 100;

/// Minimum correlation for a face to be labeled in the live detection list.
pub const DEFAULT_DISPLAY_THRESHOLD: f64 = 0.3;

/// Minimum correlation for a detection to create an attendance record.
pub const DEFAULT_AUTO_MARK_THRESHOLD: f64 = 0.3;

/// Capture loop pacing (~30 fps target, not a guarantee).
pub const CAPTURE_INTERVAL: Duration = Duration::from_millis(33);

/// Delay before re-reading after a failed frame read in retry mode.
pub const READ_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Detection cycle pacing (~5 Hz); matching is costlier than capture.
pub const DETECTION_CYCLE_INTERVAL: Duration = Duration::from_millis(200);

/// Delay between polls while waiting for the first captured frame.
pub const DETECTION_IDLE_DELAY: Duration = Duration::from_millis(100);

/// How long `stop()` waits for a worker before detaching it.
pub const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How long session start waits for the worker to finish locator setup.
pub const SESSION_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// MJPEG chunk pacing cap (~30 chunks/sec).
pub const STREAM_FRAME_INTERVAL: Duration = Duration::from_millis(33);

pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Accepted enrollment photo formats.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];
