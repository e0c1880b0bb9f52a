//! SeetaFace funnel-structured cascade face locator.
//!
//! Wraps the `rustface` detector behind the [`FaceLocator`] trait so the
//! preprocessing pipeline can be exercised with stub locators in tests.

use crate::types::FaceBox;
use image::GrayImage;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const DEFAULT_SCALE_FACTOR: f32 = 1.1;
const DEFAULT_MIN_FACE_SIZE: u32 = 30;
const DEFAULT_SCORE_THRESHOLD: f64 = 2.0;
const SLIDE_WINDOW_STEP: u32 = 4;
/// The funnel cascade scans with a fixed 20px window; smaller minimums are rejected.
const CASCADE_MIN_WINDOW: u32 = 20;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download seeta_fd_frontal_v1.0.bin and place in models/")]
    ModelNotFound(String),
    #[error("failed to load cascade model {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("detection failed: {0}")]
    DetectionFailed(String),
}

/// Multi-scale detection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    /// Ratio between successive pyramid levels (> 1.0).
    pub scale_factor: f32,
    /// Smallest face edge, in source-image pixels.
    pub min_face_size: u32,
    /// Cascade score a candidate window must reach to count as a face.
    pub score_threshold: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }
}

/// Finds faces in a grayscale raster.
///
/// Returned boxes are in detector order, clamped to the image bounds.
pub trait FaceLocator {
    fn locate(&mut self, gray: &GrayImage) -> Result<Vec<FaceBox>, DetectorError>;
}

/// Cascade-based face locator.
pub struct CascadeLocator {
    detector: Box<dyn rustface::Detector>,
    params: DetectorParams,
}

impl CascadeLocator {
    /// Load the SeetaFace cascade model from the given path.
    pub fn load(model_path: &str, params: DetectorParams) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let mut detector =
            rustface::create_detector(model_path).map_err(|source| DetectorError::Load {
                path: model_path.to_string(),
                source,
            })?;

        // rustface expresses the pyramid step as a shrink ratio in (0, 1).
        detector.set_pyramid_scale_factor(1.0 / params.scale_factor.max(1.01));
        detector.set_min_face_size(params.min_face_size.max(CASCADE_MIN_WINDOW));
        detector.set_score_thresh(params.score_threshold);
        detector.set_slide_window_step(SLIDE_WINDOW_STEP, SLIDE_WINDOW_STEP);

        tracing::info!(
            path = model_path,
            scale_factor = params.scale_factor,
            min_face_size = params.min_face_size,
            score_threshold = params.score_threshold,
            "loaded cascade face detector"
        );

        Ok(Self { detector, params })
    }
}

impl FaceLocator for CascadeLocator {
    fn locate(&mut self, gray: &GrayImage) -> Result<Vec<FaceBox>, DetectorError> {
        let (width, height) = gray.dimensions();
        if width < self.params.min_face_size || height < self.params.min_face_size {
            tracing::debug!(width, height, "image smaller than minimum face size");
            return Ok(Vec::new());
        }

        let image = rustface::ImageData::new(gray.as_raw(), width, height);
        let detector = &mut self.detector;

        // rustface panics on inputs it considers illegal; keep that off the engine thread.
        let faces = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(&image)))
            .map_err(|payload| DetectorError::DetectionFailed(panic_message(payload)))?;

        let boxes: Vec<FaceBox> = faces
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                clamp_box(
                    bbox.x(),
                    bbox.y(),
                    bbox.width(),
                    bbox.height(),
                    face.score(),
                    width,
                    height,
                )
            })
            .collect();

        tracing::debug!(candidates = faces.len(), kept = boxes.len(), "cascade detection");
        Ok(boxes)
    }
}

/// Clip a detector rectangle (which may extend past the edges) to the image.
/// Returns `None` when nothing of the rectangle lies inside the image.
fn clamp_box(
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    score: f64,
    image_width: u32,
    image_height: u32,
) -> Option<FaceBox> {
    let x0 = i64::from(x).max(0);
    let y0 = i64::from(y).max(0);
    let x1 = (i64::from(x) + i64::from(width)).min(i64::from(image_width));
    let y1 = (i64::from(y) + i64::from(height)).min(i64::from(image_height));

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(FaceBox {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
        score,
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "detector panicked".to_string()
    }
}
