pub mod detection;
pub mod encoder;
pub mod enrolled_face;
pub mod face_locator;
pub mod matcher;
pub mod photo_encoder;
