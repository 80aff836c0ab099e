use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::recognition::domain::encoder::{self, Encoding};
use crate::recognition::domain::face_locator::FaceLocator;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("unsupported photo format (accepted: jpg, jpeg, png, gif)")]
    UnsupportedFormat,
    #[error("could not read photo {path}: {source}")]
    UnreadablePhoto {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no face found in the photo; a clear face photo is required")]
    NoFaceFound,
}

pub fn is_supported_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Turns an enrollment photo into a reference encoding.
///
/// A photo with no detectable face is a rejection (the caller must not
/// persist anything for it). A photo with several faces enrolls the single
/// largest one (deliberate policy, ties broken by scan order).
pub struct PhotoEncoder {
    locator: Box<dyn FaceLocator>,
}

impl PhotoEncoder {
    pub fn new(locator: Box<dyn FaceLocator>) -> Self {
        Self { locator }
    }

    pub fn encode_from_image_path(&mut self, path: &Path) -> Result<Encoding, EnrollError> {
        if !is_supported_photo(path) {
            return Err(EnrollError::UnsupportedFormat);
        }

        let photo = image::open(path)
            .map_err(|source| EnrollError::UnreadablePhoto {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        let (width, height) = photo.dimensions();
        let frame = Frame::new(photo.into_raw(), width, height);

        let regions = self.locator.locate(&frame);
        let chosen = FaceRegion::largest(&regions).ok_or(EnrollError::NoFaceFound)?;

        encoder::encode_region(&frame, &chosen).ok_or(EnrollError::NoFaceFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::CANONICAL_PATCH_SIZE;
    use std::path::PathBuf;

    /// Returns the same regions for every frame.
    struct FixedLocator {
        regions: Vec<FaceRegion>,
    }

    impl FaceLocator for FixedLocator {
        fn locate(&mut self, _frame: &Frame) -> Vec<FaceRegion> {
            self.regions.clone()
        }
    }

    fn encoder_with(regions: Vec<FaceRegion>) -> PhotoEncoder {
        PhotoEncoder::new(Box::new(FixedLocator { regions }))
    }

    fn write_photo(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let mut img = image::RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = image::Rgb([(x % 256) as u8, (y % 256) as u8, 90]);
        }
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_rejects_unsupported_extension() {
        let mut enc = encoder_with(vec![FaceRegion::new(0, 0, 10, 10)]);
        let result = enc.encode_from_image_path(Path::new("photo.bmp"));
        assert!(matches!(result, Err(EnrollError::UnsupportedFormat)));
    }

    #[test]
    fn test_rejects_missing_file() {
        let mut enc = encoder_with(vec![FaceRegion::new(0, 0, 10, 10)]);
        let result = enc.encode_from_image_path(Path::new("/nonexistent/photo.jpg"));
        assert!(matches!(result, Err(EnrollError::UnreadablePhoto { .. })));
    }

    #[test]
    fn test_rejects_photo_with_no_face() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_photo(dir.path(), "empty.png", 64, 64);
        let mut enc = encoder_with(vec![]);
        let result = enc.encode_from_image_path(&path);
        assert!(matches!(result, Err(EnrollError::NoFaceFound)));
    }

    #[test]
    fn test_encodes_single_face() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_photo(dir.path(), "one.png", 64, 64);
        let mut enc = encoder_with(vec![FaceRegion::new(8, 8, 32, 32)]);
        let encoding = enc.encode_from_image_path(&path).unwrap();
        assert_eq!(
            encoding.len(),
            (CANONICAL_PATCH_SIZE * CANONICAL_PATCH_SIZE) as usize
        );
    }

    #[test]
    fn test_multiple_faces_enrolls_largest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_photo(dir.path(), "crowd.png", 96, 96);
        let small = FaceRegion::new(0, 0, 16, 16);
        let large = FaceRegion::new(40, 40, 48, 48);
        let mut pick_large = encoder_with(vec![small, large]);
        let mut only_large = encoder_with(vec![large]);

        let from_crowd = pick_large.encode_from_image_path(&path).unwrap();
        let from_large = only_large.encode_from_image_path(&path).unwrap();
        assert_eq!(from_crowd, from_large);
    }

    #[test]
    fn test_extension_check_is_case_insensitive() {
        assert!(is_supported_photo(Path::new("a.JPG")));
        assert!(is_supported_photo(Path::new("a.jpeg")));
        assert!(is_supported_photo(Path::new("a.Png")));
        assert!(is_supported_photo(Path::new("a.gif")));
        assert!(!is_supported_photo(Path::new("a.tiff")));
        assert!(!is_supported_photo(Path::new("a")));
    }
}
