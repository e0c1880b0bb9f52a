//! Face preprocessing: decode → grayscale → locate → crop → 48×48 → [0, 1] tensor.

use crate::locator::{DetectorError, FaceLocator};
use crate::types::FaceBox;
use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;
use std::str::FromStr;
use thiserror::Error;

/// Edge length of the square face crop fed to the classifier.
pub const FACE_INPUT_SIZE: usize = 48;

/// Classifier input: (batch=1, channels=1, height=48, width=48), row-major.
pub type FaceTensor = Array4<f32>;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Invalid image format")]
    Decode(#[source] image::ImageError),
    #[error("No face detected")]
    NoFaceDetected,
    #[error(transparent)]
    Detector(#[from] DetectorError),
}

/// Which detected box to crop when the detector reports several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaceSelection {
    /// The first box in detector order.
    #[default]
    First,
    /// The box with the largest area; earlier boxes win ties.
    Largest,
}

impl FromStr for FaceSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(FaceSelection::First),
            "largest" => Ok(FaceSelection::Largest),
            other => Err(format!("unknown face selection policy: {other}")),
        }
    }
}

/// Turns encoded image bytes into a normalized face tensor.
pub struct FacePreprocessor {
    locator: Box<dyn FaceLocator>,
    selection: FaceSelection,
}

impl FacePreprocessor {
    pub fn new(locator: Box<dyn FaceLocator>, selection: FaceSelection) -> Self {
        Self { locator, selection }
    }

    pub fn preprocess(&mut self, image_bytes: &[u8]) -> Result<FaceTensor, PreprocessError> {
        let gray = decode_grayscale(image_bytes)?;
        let faces = self.locator.locate(&gray)?;

        let face = select_face(&faces, self.selection).ok_or(PreprocessError::NoFaceDetected)?;
        tracing::debug!(
            detected = faces.len(),
            x = face.x,
            y = face.y,
            width = face.width,
            height = face.height,
            "face selected"
        );

        let crop = imageops::crop_imm(&gray, face.x, face.y, face.width, face.height).to_image();
        let size = FACE_INPUT_SIZE as u32;
        let resized = imageops::resize(&crop, size, size, FilterType::Triangle);

        Ok(to_tensor(&resized))
    }
}

/// Decode arbitrary encoded image bytes into an 8-bit grayscale raster.
pub fn decode_grayscale(image_bytes: &[u8]) -> Result<GrayImage, PreprocessError> {
    let decoded = image::load_from_memory(image_bytes).map_err(PreprocessError::Decode)?;
    Ok(decoded.to_luma8())
}

pub fn select_face(faces: &[FaceBox], selection: FaceSelection) -> Option<FaceBox> {
    match selection {
        FaceSelection::First => faces.first().copied(),
        FaceSelection::Largest => faces
            .iter()
            .copied()
            .fold(None, |best: Option<FaceBox>, f| match best {
                Some(b) if b.area() >= f.area() => Some(b),
                _ => Some(f),
            }),
    }
}

/// Scale 0–255 intensities of a 48×48 raster into a (1, 1, 48, 48) tensor in [0, 1].
fn to_tensor(face: &GrayImage) -> FaceTensor {
    FaceTensor::from_shape_fn(
        (1, 1, FACE_INPUT_SIZE, FACE_INPUT_SIZE),
        |(_, _, y, x)| {
            face.get_pixel_checked(x as u32, y as u32)
                .map(|p| f32::from(p[0]) / 255.0)
                .unwrap_or(0.0)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    struct FixedLocator(Vec<FaceBox>);

    impl FaceLocator for FixedLocator {
        fn locate(&mut self, _gray: &GrayImage) -> Result<Vec<FaceBox>, DetectorError> {
            Ok(self.0.clone())
        }
    }

    fn face(x: u32, y: u32, w: u32, h: u32) -> FaceBox {
        FaceBox { x, y, width: w, height: h, score: 1.0 }
    }

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_grayscale(b"definitely not an image").unwrap_err();
        assert!(matches!(err, PreprocessError::Decode(_)));
        assert_eq!(err.to_string(), "Invalid image format");
    }

    #[test]
    fn test_decode_color_to_gray() {
        let img = RgbImage::from_pixel(8, 6, Rgb([255, 255, 255]));
        let gray = decode_grayscale(&png_bytes(&img)).unwrap();
        assert_eq!(gray.dimensions(), (8, 6));
        assert!(gray.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_select_first() {
        let faces = [face(0, 0, 10, 10), face(5, 5, 50, 50)];
        assert_eq!(select_face(&faces, FaceSelection::First), Some(faces[0]));
    }

    #[test]
    fn test_select_largest_prefers_earlier_on_tie() {
        let faces = [face(0, 0, 10, 10), face(5, 5, 50, 50), face(9, 9, 50, 50)];
        assert_eq!(select_face(&faces, FaceSelection::Largest), Some(faces[1]));
    }

    #[test]
    fn test_select_empty() {
        assert_eq!(select_face(&[], FaceSelection::First), None);
        assert_eq!(select_face(&[], FaceSelection::Largest), None);
    }

    #[test]
    fn test_face_selection_from_str() {
        assert_eq!("first".parse::<FaceSelection>(), Ok(FaceSelection::First));
        assert_eq!(" Largest ".parse::<FaceSelection>(), Ok(FaceSelection::Largest));
        assert!("biggest".parse::<FaceSelection>().is_err());
    }

    #[test]
    fn test_no_face_detected() {
        let mut pre = FacePreprocessor::new(Box::new(FixedLocator(vec![])), FaceSelection::First);
        let img = RgbImage::from_pixel(64, 64, Rgb([120, 120, 120]));
        let err = pre.preprocess(&png_bytes(&img)).unwrap_err();
        assert!(matches!(err, PreprocessError::NoFaceDetected));
        assert_eq!(err.to_string(), "No face detected");
    }

    #[test]
    fn test_tensor_shape_and_range() {
        let img = RgbImage::from_fn(100, 80, |x, y| {
            let v = ((x + y) % 256) as u8;
            Rgb([v, v, v])
        });
        let mut pre = FacePreprocessor::new(
            Box::new(FixedLocator(vec![face(10, 10, 60, 60)])),
            FaceSelection::First,
        );
        let tensor = pre.preprocess(&png_bytes(&img)).unwrap();
        assert_eq!(tensor.shape(), &[1, 1, FACE_INPUT_SIZE, FACE_INPUT_SIZE]);
        assert!(tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_crop_uses_selected_box() {
        // Left half black, right half white; a box over the right half must be all ones.
        let img = RgbImage::from_fn(100, 50, |x, _| {
            if x < 50 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        });
        let mut pre = FacePreprocessor::new(
            Box::new(FixedLocator(vec![face(50, 0, 50, 50), face(0, 0, 50, 50)])),
            FaceSelection::First,
        );
        let tensor = pre.preprocess(&png_bytes(&img)).unwrap();
        assert!(tensor.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_to_tensor_normalization() {
        let size = FACE_INPUT_SIZE as u32;
        let gray = GrayImage::from_fn(size, size, |x, _| if x == 0 { Luma([0]) } else { Luma([255]) });
        let tensor = to_tensor(&gray);
        assert_eq!(tensor[[0, 0, 3, 0]], 0.0);
        assert_eq!(tensor[[0, 0, 3, 1]], 1.0);
    }
}
