//! Image-to-prediction pipeline: preprocess → classify → softmax → package.

use crate::classifier::{ClassifierError, EmotionClassifier};
use crate::locator::DetectorError;
use crate::preprocess::{FacePreprocessor, PreprocessError};
use crate::types::{EmotionDistribution, Prediction, EMOTION_COUNT};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid image format")]
    Decode(#[source] image::ImageError),
    #[error("No face detected")]
    NoFaceDetected,
    #[error("Face detection error: {0}")]
    Detection(#[source] DetectorError),
    #[error("Model not loaded")]
    ModelUnavailable,
    #[error("Prediction error: {0}")]
    Inference(#[from] ClassifierError),
}

impl PipelineError {
    /// Whether the user can fix this by uploading a different photo.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, PipelineError::Decode(_) | PipelineError::NoFaceDetected)
    }
}

impl From<PreprocessError> for PipelineError {
    fn from(e: PreprocessError) -> Self {
        match e {
            PreprocessError::Decode(source) => PipelineError::Decode(source),
            PreprocessError::NoFaceDetected => PipelineError::NoFaceDetected,
            PreprocessError::Detector(source) => PipelineError::Detection(source),
        }
    }
}

/// Owns the loaded locator and classifier.
///
/// A `None` classifier means the model failed to load at startup; every
/// prediction then fails with [`PipelineError::ModelUnavailable`].
pub struct Predictor {
    preprocessor: FacePreprocessor,
    classifier: Option<Box<dyn EmotionClassifier>>,
}

impl Predictor {
    pub fn new(
        preprocessor: FacePreprocessor,
        classifier: Option<Box<dyn EmotionClassifier>>,
    ) -> Self {
        Self {
            preprocessor,
            classifier,
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn predict(&mut self, image_bytes: &[u8]) -> Result<Prediction, PipelineError> {
        let tensor = self.preprocessor.preprocess(image_bytes)?;

        let classifier = self
            .classifier
            .as_mut()
            .ok_or(PipelineError::ModelUnavailable)?;
        let scores = classifier.classify(&tensor)?;

        let prediction = prediction_from_scores(&scores)?;
        tracing::debug!(
            dominant = %prediction.dominant_emotion,
            confidence = prediction.confidence,
            "prediction complete"
        );
        Ok(prediction)
    }
}

/// Softmax the raw scores and package the dominant label and confidence.
pub fn prediction_from_scores(scores: &[f32; EMOTION_COUNT]) -> Result<Prediction, PipelineError> {
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(PipelineError::Inference(ClassifierError::InferenceFailed(
            format!("non-finite score: {bad}"),
        )));
    }
    Ok(Prediction::from_distribution(EmotionDistribution::softmax(scores)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::FaceLocator;
    use crate::preprocess::{FaceSelection, FaceTensor};
    use crate::types::{Emotion, FaceBox};
    use image::{GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    /// Reports one whole-image face unless the image is entirely black.
    struct BrightnessLocator;

    impl FaceLocator for BrightnessLocator {
        fn locate(&mut self, gray: &GrayImage) -> Result<Vec<FaceBox>, DetectorError> {
            if gray.pixels().all(|p| p[0] == 0) {
                return Ok(vec![]);
            }
            let (width, height) = gray.dimensions();
            Ok(vec![FaceBox { x: 0, y: 0, width, height, score: 5.0 }])
        }
    }

    struct FixedClassifier([f32; EMOTION_COUNT]);

    impl EmotionClassifier for FixedClassifier {
        fn classify(&mut self, tensor: &FaceTensor) -> Result<[f32; EMOTION_COUNT], ClassifierError> {
            assert_eq!(tensor.shape(), &[1, 1, 48, 48]);
            Ok(self.0)
        }
    }

    struct FailingClassifier;

    impl EmotionClassifier for FailingClassifier {
        fn classify(&mut self, _tensor: &FaceTensor) -> Result<[f32; EMOTION_COUNT], ClassifierError> {
            Err(ClassifierError::InferenceFailed("shape mismatch".into()))
        }
    }

    fn predictor(classifier: Option<Box<dyn EmotionClassifier>>) -> Predictor {
        Predictor::new(
            FacePreprocessor::new(Box::new(BrightnessLocator), FaceSelection::First),
            classifier,
        )
    }

    fn png(value: u8) -> Vec<u8> {
        let img = GrayImage::from_pixel(64, 64, Luma([value]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn test_predict_happy_path() {
        let mut p = predictor(Some(Box::new(FixedClassifier([0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 1.0]))));
        let prediction = p.predict(&png(128)).unwrap();
        assert_eq!(prediction.dominant_emotion, Emotion::Happy);
        let sum: f64 = prediction.distribution.as_array().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(
            (prediction.confidence - 100.0 * prediction.distribution.probability(Emotion::Happy)).abs()
                < 1e-12
        );
    }

    #[test]
    fn test_predict_invalid_image_is_soft() {
        let mut p = predictor(Some(Box::new(FixedClassifier([0.0; EMOTION_COUNT]))));
        let err = p.predict(b"\x00\x01garbage").unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
        assert!(err.is_user_correctable());
        assert_eq!(err.to_string(), "Invalid image format");
    }

    #[test]
    fn test_predict_no_face_is_soft() {
        let mut p = predictor(Some(Box::new(FixedClassifier([0.0; EMOTION_COUNT]))));
        let err = p.predict(&png(0)).unwrap_err();
        assert!(matches!(err, PipelineError::NoFaceDetected));
        assert!(err.is_user_correctable());
        assert_eq!(err.to_string(), "No face detected");
    }

    #[test]
    fn test_predict_without_model() {
        let mut p = predictor(None);
        assert!(!p.model_loaded());
        let err = p.predict(&png(128)).unwrap_err();
        assert!(matches!(err, PipelineError::ModelUnavailable));
        assert!(!err.is_user_correctable());
        assert_eq!(err.to_string(), "Model not loaded");
    }

    #[test]
    fn test_no_face_checked_before_model() {
        let mut p = predictor(None);
        assert!(matches!(p.predict(&png(0)), Err(PipelineError::NoFaceDetected)));
    }

    #[test]
    fn test_predict_inference_failure() {
        let mut p = predictor(Some(Box::new(FailingClassifier)));
        let err = p.predict(&png(128)).unwrap_err();
        assert!(matches!(err, PipelineError::Inference(_)));
        assert_eq!(err.to_string(), "Prediction error: inference failed: shape mismatch");
    }

    #[test]
    fn test_non_finite_scores_rejected() {
        let err = prediction_from_scores(&[f32::NAN, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, PipelineError::Inference(_)));
        let err = prediction_from_scores(&[f32::INFINITY, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, PipelineError::Inference(_)));
    }

    #[test]
    fn test_tie_break_prefers_lowest_index() {
        let prediction = prediction_from_scores(&[5.0, 5.0, 1.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
        assert_eq!(prediction.dominant_emotion, Emotion::Angry);
    }

    #[test]
    fn test_extreme_scores_are_stable() {
        let prediction = prediction_from_scores(&[1000.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
        assert_eq!(prediction.dominant_emotion, Emotion::Angry);
        assert!((prediction.confidence - 100.0).abs() < 1e-6);
        assert!(prediction.distribution.as_array().iter().all(|p| !p.is_nan()));
    }
}
