use moodlens_core::{DetectorParams, FaceSelection};
use moodlens_store::DEFAULT_AVATAR_URL;
use std::path::PathBuf;
use std::str::FromStr;

use crate::engine::EngineSettings;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address to listen on (default: 0.0.0.0:5000).
    pub bind_addr: String,
    /// Directory containing the model files.
    pub model_dir: PathBuf,
    /// FER ONNX model.
    pub classifier_model: PathBuf,
    /// SeetaFace cascade model.
    pub detector_model: PathBuf,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Secret used to sign session cookies. Unset means a random per-process key.
    pub secret_key: Option<String>,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
    /// Number of results returned by the history endpoint.
    pub history_limit: usize,
    /// Username of the identity sessions fall back to.
    pub default_user: String,
    pub default_avatar_url: String,
    pub detector_params: DetectorParams,
    pub face_selection: FaceSelection,
}

impl Config {
    /// Load configuration from `MOODLENS_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_dir = lookup("MOODLENS_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("models"));

        let classifier_model = lookup("MOODLENS_CLASSIFIER_MODEL")
            .map(PathBuf::from)
            .unwrap_or_else(|| model_dir.join("fer_cnn_model.onnx"));

        let detector_model = lookup("MOODLENS_DETECTOR_MODEL")
            .map(PathBuf::from)
            .unwrap_or_else(|| model_dir.join("seeta_fd_frontal_v1.0.bin"));

        let data_dir = lookup("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("moodlens");

        let db_path = lookup("MOODLENS_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("app.db"));

        let defaults = DetectorParams::default();
        let detector_params = DetectorParams {
            scale_factor: parsed(&lookup, "MOODLENS_DETECT_SCALE_FACTOR", defaults.scale_factor),
            min_face_size: parsed(&lookup, "MOODLENS_DETECT_MIN_FACE", defaults.min_face_size),
            score_threshold: parsed(
                &lookup,
                "MOODLENS_DETECT_SCORE_THRESHOLD",
                defaults.score_threshold,
            ),
        };

        let face_selection = match lookup("MOODLENS_FACE_SELECTION") {
            Some(raw) => FaceSelection::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to first-face selection");
                FaceSelection::First
            }),
            None => FaceSelection::First,
        };

        Self {
            bind_addr: lookup("MOODLENS_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:5000".to_string()),
            model_dir,
            classifier_model,
            detector_model,
            db_path,
            secret_key: lookup("MOODLENS_SECRET_KEY").filter(|s| !s.is_empty()),
            max_upload_bytes: parsed(&lookup, "MOODLENS_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            history_limit: parsed(&lookup, "MOODLENS_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT),
            default_user: lookup("MOODLENS_DEFAULT_USER")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "demo".to_string()),
            default_avatar_url: lookup("MOODLENS_DEFAULT_AVATAR_URL")
                .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string()),
            detector_params,
            face_selection,
        }
    }

    /// Model paths and detection settings for the inference engine.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            detector_model: self.detector_model.to_string_lossy().into_owned(),
            classifier_model: self.classifier_model.to_string_lossy().into_owned(),
            detector_params: self.detector_params,
            face_selection: self.face_selection,
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[("HOME", "/home/ada")]);
        assert_eq!(c.bind_addr, "0.0.0.0:5000");
        assert_eq!(c.classifier_model, PathBuf::from("models/fer_cnn_model.onnx"));
        assert_eq!(c.detector_model, PathBuf::from("models/seeta_fd_frontal_v1.0.bin"));
        assert_eq!(c.db_path, PathBuf::from("/home/ada/.local/share/moodlens/app.db"));
        assert_eq!(c.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(c.history_limit, 10);
        assert_eq!(c.default_user, "demo");
        assert_eq!(c.secret_key, None);
        assert_eq!(c.face_selection, FaceSelection::First);
        assert_eq!(c.detector_params, DetectorParams::default());
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("MOODLENS_MODEL_DIR", "/opt/models"),
            ("MOODLENS_DB_PATH", "/var/lib/moodlens.db"),
            ("MOODLENS_SECRET_KEY", "hunter2"),
            ("MOODLENS_HISTORY_LIMIT", "25"),
            ("MOODLENS_DETECT_MIN_FACE", "40"),
            ("MOODLENS_FACE_SELECTION", "largest"),
        ]);
        assert_eq!(c.classifier_model, PathBuf::from("/opt/models/fer_cnn_model.onnx"));
        assert_eq!(c.db_path, PathBuf::from("/var/lib/moodlens.db"));
        assert_eq!(c.secret_key.as_deref(), Some("hunter2"));
        assert_eq!(c.history_limit, 25);
        assert_eq!(c.detector_params.min_face_size, 40);
        assert_eq!(c.face_selection, FaceSelection::Largest);
    }

    #[test]
    fn test_xdg_data_home() {
        let c = config(&[("XDG_DATA_HOME", "/data")]);
        assert_eq!(c.db_path, PathBuf::from("/data/moodlens/app.db"));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let c = config(&[
            ("MOODLENS_HISTORY_LIMIT", "lots"),
            ("MOODLENS_FACE_SELECTION", "biggest"),
            ("MOODLENS_SECRET_KEY", ""),
            ("MOODLENS_DEFAULT_USER", "  "),
        ]);
        assert_eq!(c.history_limit, 10);
        assert_eq!(c.face_selection, FaceSelection::First);
        assert_eq!(c.secret_key, None);
        assert_eq!(c.default_user, "demo");
    }

    #[test]
    fn test_engine_settings() {
        let c = config(&[("MOODLENS_CLASSIFIER_MODEL", "/m/fer.onnx")]);
        let s = c.engine_settings();
        assert_eq!(s.classifier_model, "/m/fer.onnx");
        assert_eq!(s.face_selection, FaceSelection::First);
    }
}
