//! Emotion analysis records. Rows are insert-only.

use crate::time_ago::time_ago;
use crate::{format_timestamp, parse_timestamp, Store, StoreError};
use chrono::{DateTime, Utc};
use moodlens_core::{Emotion, EmotionDistribution, Prediction};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use std::str::FromStr;

/// One persisted prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub user_id: i64,
    pub dominant_emotion: Emotion,
    /// Percentage (0–100).
    pub confidence: f64,
    pub full_results: EmotionDistribution,
    pub timestamp: DateTime<Utc>,
    pub image_thumbnail: Option<String>,
}

impl AnalysisRecord {
    /// Relative age of this record as seen at `now`.
    pub fn time_ago(&self, now: DateTime<Utc>) -> String {
        time_ago(now, self.timestamp)
    }
}

struct ResultRow {
    id: i64,
    user_id: i64,
    dominant_emotion: String,
    confidence: f64,
    full_results_json: String,
    timestamp: String,
    image_thumbnail: Option<String>,
}

impl ResultRow {
    fn into_record(self) -> Result<AnalysisRecord, StoreError> {
        let id = self.id;
        let dominant_emotion =
            Emotion::from_str(&self.dominant_emotion).map_err(|e| StoreError::Corrupt {
                id,
                reason: e.to_string(),
            })?;
        let full_results: EmotionDistribution = serde_json::from_str(&self.full_results_json)
            .map_err(|e| StoreError::Corrupt {
                id,
                reason: format!("bad distribution: {e}"),
            })?;
        let timestamp = parse_timestamp(id, &self.timestamp)?;

        Ok(AnalysisRecord {
            id,
            user_id: self.user_id,
            dominant_emotion,
            confidence: self.confidence,
            full_results,
            timestamp,
            image_thumbnail: self.image_thumbnail,
        })
    }
}

impl Store {
    /// Persist a prediction for `user_id`, timestamped now.
    pub async fn save_result(
        &self,
        user_id: i64,
        prediction: &Prediction,
        image_thumbnail: Option<String>,
    ) -> Result<AnalysisRecord, StoreError> {
        self.save_result_at(user_id, prediction, image_thumbnail, Utc::now())
            .await
    }

    /// Persist a prediction with an explicit timestamp.
    pub async fn save_result_at(
        &self,
        user_id: i64,
        prediction: &Prediction,
        image_thumbnail: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<AnalysisRecord, StoreError> {
        let full_results_json = serde_json::to_string(&prediction.distribution)?;
        let dominant = prediction.dominant_emotion.label();
        let confidence = prediction.confidence;
        let ts = format_timestamp(timestamp);
        let thumbnail = image_thumbnail.clone();

        let id = self
            .conn
            .call(move |c| {
                let tx = c.transaction()?;
                let exists = tx
                    .query_row("SELECT 1 FROM users WHERE id = ?1", params![user_id], |_| Ok(()))
                    .optional()?
                    .is_some();
                if !exists {
                    return Ok(None);
                }
                tx.execute(
                    "INSERT INTO analysis_results
                        (user_id, dominant_emotion, confidence, full_results_json, timestamp, image_thumbnail)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![user_id, dominant, confidence, full_results_json, ts, thumbnail],
                )?;
                let id = tx.last_insert_rowid();
                tx.commit()?;
                Ok(Some(id))
            })
            .await?
            .ok_or(StoreError::UnknownUser(user_id))?;

        tracing::debug!(id, user_id, dominant, confidence, "analysis result saved");

        Ok(AnalysisRecord {
            id,
            user_id,
            dominant_emotion: prediction.dominant_emotion,
            confidence,
            full_results: prediction.distribution,
            timestamp: parse_timestamp(id, &format_timestamp(timestamp))?,
            image_thumbnail,
        })
    }

    /// The `limit` most recent records for `user_id`, newest first.
    pub async fn recent_results(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<AnalysisRecord>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = self
            .conn
            .call(move |c| {
                let mut stmt = c.prepare(
                    "SELECT id, user_id, dominant_emotion, confidence, full_results_json,
                            timestamp, image_thumbnail
                     FROM analysis_results
                     WHERE user_id = ?1
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![user_id, limit], |row| {
                        Ok(ResultRow {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            dominant_emotion: row.get(2)?,
                            confidence: row.get(3)?,
                            full_results_json: row.get(4)?,
                            timestamp: row.get(5)?,
                            image_thumbnail: row.get(6)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter().map(ResultRow::into_record).collect()
    }
}
