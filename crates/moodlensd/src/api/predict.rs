//! POST /api/predict

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use axum_extra::extract::cookie::SignedCookieJar;
use moodlens_core::{Emotion, EmotionDistribution};
use serde::Serialize;

use super::{current_user, round2, ApiError};
use crate::AppState;

const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub status: &'static str,
    pub dominant_emotion: Emotion,
    pub confidence: f64,
    pub distribution: EmotionDistribution,
}

/// POST /api/predict
///
/// Accepts `multipart/form-data` with an `image` file field, classifies the
/// face in it and records the result for the session's user.
pub async fn predict(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(SignedCookieJar, Json<PredictResponse>), ApiError> {
    let multipart =
        multipart.map_err(|_| ApiError::Validation("No image file provided".to_string()))?;
    let image = read_image_field(multipart).await?;

    let (user, jar) = current_user(&state, jar).await?;
    let prediction = state.service.predict(user.id, image).await?;

    Ok((
        jar,
        Json(PredictResponse {
            status: "success",
            dominant_emotion: prediction.dominant_emotion,
            confidence: round2(prediction.confidence),
            distribution: prediction.distribution,
        }),
    ))
}

/// Pull the bytes of the `image` file field. Other fields are skipped.
async fn read_image_field(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        match file_name.as_deref() {
            None => break,
            Some("") => return Err(ApiError::Validation("No image selected".to_string())),
            Some(_) => return Ok(field.bytes().await?.to_vec()),
        }
    }
    Err(ApiError::Validation("No image file provided".to_string()))
}
