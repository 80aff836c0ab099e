#[cfg(feature = "live-camera")]
pub mod opencv_camera;
