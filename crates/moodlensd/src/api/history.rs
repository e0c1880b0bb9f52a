//! GET /api/history

use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::SignedCookieJar;
use chrono::{SecondsFormat, Utc};
use moodlens_core::{Emotion, EmotionDistribution};
use moodlens_store::AnalysisRecord;
use serde::Serialize;

use super::{current_user, round2, ApiError};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub dominant_emotion: Emotion,
    pub confidence: f64,
    pub full_results: EmotionDistribution,
    pub timestamp: String,
    pub time_ago: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub status: &'static str,
    pub history: Vec<HistoryEntry>,
}

impl HistoryEntry {
    fn from_record(record: &AnalysisRecord, now: chrono::DateTime<Utc>) -> Self {
        Self {
            id: record.id,
            dominant_emotion: record.dominant_emotion,
            confidence: round2(record.confidence),
            full_results: record.full_results,
            timestamp: record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            time_ago: record.time_ago(now),
        }
    }
}

/// GET /api/history
///
/// Most recent analyses for the session's user, newest first.
pub async fn get_history(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Json<HistoryResponse>), ApiError> {
    let (user, jar) = current_user(&state, jar).await.map_err(fetch_failed)?;
    let records = state
        .store
        .recent_results(user.id, state.history_limit)
        .await
        .map_err(fetch_failed)?;

    let now = Utc::now();
    let history = records
        .iter()
        .map(|record| HistoryEntry::from_record(record, now))
        .collect();

    Ok((
        jar,
        Json(HistoryResponse {
            status: "success",
            history,
        }),
    ))
}

fn fetch_failed(e: impl std::fmt::Display) -> ApiError {
    ApiError::Internal(format!("Error fetching history: {e}"))
}
