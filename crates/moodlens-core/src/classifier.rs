//! FER emotion classifier via ONNX Runtime.
//!
//! Takes a (1, 1, 48, 48) face tensor and returns one raw score per emotion
//! label, in [`Emotion::ALL`](crate::Emotion::ALL) order.

use crate::preprocess::{FaceTensor, FACE_INPUT_SIZE};
use crate::types::EMOTION_COUNT;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const FER_INPUT_SHAPE: [usize; 4] = [1, 1, FACE_INPUT_SIZE, FACE_INPUT_SIZE];

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Produces raw (pre-softmax) emotion scores for a face tensor.
pub trait EmotionClassifier {
    fn classify(&mut self, tensor: &FaceTensor) -> Result<[f32; EMOTION_COUNT], ClassifierError>;
}

/// ONNX-backed emotion classifier.
pub struct OnnxEmotionClassifier {
    session: Session,
}

impl OnnxEmotionClassifier {
    /// Load the FER ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, ClassifierError> {
        if !Path::new(model_path).exists() {
            return Err(ClassifierError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded FER model"
        );

        Ok(Self { session })
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn classify(&mut self, tensor: &FaceTensor) -> Result<[f32; EMOTION_COUNT], ClassifierError> {
        check_input_shape(tensor.shape())?;

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(tensor.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceFailed(format!("score extraction: {e}")))?;

        scores_from_slice(raw)
    }
}

fn check_input_shape(shape: &[usize]) -> Result<(), ClassifierError> {
    if shape != FER_INPUT_SHAPE {
        return Err(ClassifierError::InferenceFailed(format!(
            "expected input shape {FER_INPUT_SHAPE:?}, got {shape:?}"
        )));
    }
    Ok(())
}

fn scores_from_slice(raw: &[f32]) -> Result<[f32; EMOTION_COUNT], ClassifierError> {
    <[f32; EMOTION_COUNT]>::try_from(raw).map_err(|_| {
        ClassifierError::InferenceFailed(format!(
            "expected {EMOTION_COUNT} scores, got {}",
            raw.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_from_slice_exact() {
        let raw = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];
        assert_eq!(scores_from_slice(&raw).unwrap(), raw);
    }

    #[test]
    fn test_scores_from_slice_wrong_length() {
        let err = scores_from_slice(&[1.0, 2.0]).unwrap_err();
        assert!(err.to_string().contains("expected 7 scores, got 2"));
    }

    #[test]
    fn test_check_input_shape() {
        assert!(check_input_shape(&[1, 1, 48, 48]).is_ok());
        assert!(check_input_shape(&[1, 3, 48, 48]).is_err());
    }

    #[test]
    fn test_load_missing_model() {
        let err = OnnxEmotionClassifier::load("/nonexistent/fer.onnx").err().unwrap();
        assert!(matches!(err, ClassifierError::ModelNotFound(_)));
    }
}
