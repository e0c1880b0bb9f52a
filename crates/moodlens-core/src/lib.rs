//! moodlens-core — Face location and emotion classification pipeline.
//!
//! Uses the SeetaFace cascade (via `rustface`) to find a face and a FER
//! model running on ONNX Runtime to score seven emotions.

pub mod classifier;
pub mod locator;
pub mod predictor;
pub mod preprocess;
pub mod types;

pub use classifier::{ClassifierError, EmotionClassifier, OnnxEmotionClassifier};
pub use locator::{CascadeLocator, DetectorError, DetectorParams, FaceLocator};
pub use predictor::{prediction_from_scores, PipelineError, Predictor};
pub use preprocess::{FacePreprocessor, FaceSelection, FaceTensor, PreprocessError};
pub use types::{Emotion, EmotionDistribution, FaceBox, Prediction, EMOTION_COUNT};
