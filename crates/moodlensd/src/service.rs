//! Prediction service: run the engine, persist the outcome under a user.

use moodlens_core::{PipelineError, Prediction};
use moodlens_store::{Store, StoreError};
use thiserror::Error;

use crate::engine::{EngineError, EngineHandle};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Inference engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl From<EngineError> for ServiceError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Pipeline(e) => ServiceError::Pipeline(e),
            other => ServiceError::EngineUnavailable(other.to_string()),
        }
    }
}

impl ServiceError {
    /// Decode failures and missing faces are fixed by the user, not the server.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, ServiceError::Pipeline(e) if e.is_user_correctable())
    }
}

#[derive(Clone)]
pub struct PredictionService {
    engine: EngineHandle,
    store: Store,
}

impl PredictionService {
    pub fn new(engine: EngineHandle, store: Store) -> Self {
        Self { engine, store }
    }

    pub fn model_loaded(&self) -> bool {
        self.engine.model_loaded()
    }

    /// Predict the emotion in `image` and record it for `user_id`.
    pub async fn predict(&self, user_id: i64, image: Vec<u8>) -> Result<Prediction, ServiceError> {
        let bytes = image.len();
        let prediction = self.engine.predict(image).await?;

        let record = self.store.save_result(user_id, &prediction, None).await?;
        tracing::info!(
            user_id,
            record_id = record.id,
            bytes,
            dominant = %prediction.dominant_emotion,
            confidence = prediction.confidence,
            "emotion analysed"
        );

        Ok(prediction)
    }
}
