use moodlens_core::{
    CascadeLocator, DetectorError, DetectorParams, EmotionClassifier, FacePreprocessor,
    FaceSelection, OnnxEmotionClassifier, PipelineError, Prediction, Predictor,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Requests allowed to wait for the engine before senders back off.
const ENGINE_QUEUE_DEPTH: usize = 16;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Model locations and detection settings the engine loads at startup.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub detector_model: String,
    pub classifier_model: String,
    pub detector_params: DetectorParams,
    pub face_selection: FaceSelection,
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Predict {
        image: Vec<u8>,
        reply: oneshot::Sender<Result<Prediction, PipelineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
    model_loaded: bool,
}

impl EngineHandle {
    /// Run the full pipeline (decode, locate, preprocess, classify) on encoded image bytes.
    pub async fn predict(&self, image: Vec<u8>) -> Result<Prediction, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Predict {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        let result = reply_rx.await.map_err(|_| EngineError::ChannelClosed)?;
        Ok(result?)
    }

    /// Whether the emotion model loaded at startup.
    pub fn model_loaded(&self) -> bool {
        self.model_loaded
    }
}

/// Spawn the engine with the production cascade locator and ONNX classifier.
///
/// A missing or broken detector model fails startup. A classifier that
/// cannot load leaves the engine running with every prediction reporting
/// [`PipelineError::ModelUnavailable`].
pub fn spawn_engine(settings: EngineSettings) -> Result<EngineHandle, EngineError> {
    spawn_engine_with(move || build_predictor(&settings))
}

fn build_predictor(settings: &EngineSettings) -> Result<Predictor, EngineError> {
    let locator = CascadeLocator::load(&settings.detector_model, settings.detector_params)?;

    let classifier: Option<Box<dyn EmotionClassifier>> =
        match OnnxEmotionClassifier::load(&settings.classifier_model) {
            Ok(classifier) => Some(Box::new(classifier)),
            Err(e) => {
                tracing::error!(
                    path = %settings.classifier_model,
                    error = %e,
                    "emotion model failed to load; predictions are unavailable"
                );
                None
            }
        };

    Ok(Predictor::new(
        FacePreprocessor::new(Box::new(locator), settings.face_selection),
        classifier,
    ))
}

/// Spawn the engine on a dedicated OS thread.
///
/// `build` runs on the engine thread, so the predictor it returns never has
/// to cross threads. Blocks until `build` finishes and fails fast if it errors.
pub fn spawn_engine_with<F>(build: F) -> Result<EngineHandle, EngineError>
where
    F: FnOnce() -> Result<Predictor, EngineError> + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(ENGINE_QUEUE_DEPTH);
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<bool, EngineError>>();

    std::thread::Builder::new()
        .name("moodlens-engine".into())
        .spawn(move || {
            let mut predictor = match build() {
                Ok(predictor) => {
                    let _ = ready_tx.send(Ok(predictor.model_loaded()));
                    predictor
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Predict { image, reply } => {
                        let result = predictor.predict(&image);
                        if let Err(e) = &result {
                            tracing::debug!(error = %e, "prediction failed");
                        }
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })?;

    let model_loaded = ready_rx.recv().map_err(|_| EngineError::ChannelClosed)??;
    tracing::info!(model_loaded, "inference engine ready");

    Ok(EngineHandle { tx, model_loaded })
}
