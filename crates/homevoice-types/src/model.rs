//! RASA model lifecycle types.

use crate::training::EntitySpan;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a trained model as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Ready,
    Training,
    Failed,
    Loading,
    #[serde(other)]
    Unknown,
}

impl ModelStatus {
    pub fn label(self) -> &'static str {
        match self {
            ModelStatus::Ready => "ready",
            ModelStatus::Training => "training",
            ModelStatus::Failed => "failed",
            ModelStatus::Loading => "loading",
            ModelStatus::Unknown => "unknown",
        }
    }
}

/// A trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub name: String,
    pub status: ModelStatus,
    /// Size in bytes.
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Model {
    /// Size formatted as megabytes with two decimals, or `N/A`.
    pub fn size_label(&self) -> String {
        match self.file_size {
            Some(bytes) => format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0),
            None => "N/A".to_string(),
        }
    }
}

/// `GET /rasa/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasaStatus {
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub model_ready: bool,
    #[serde(default)]
    pub model_path: Option<String>,
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
}

fn default_threshold() -> f64 {
    0.7
}

impl Default for RasaStatus {
    fn default() -> Self {
        Self {
            model_loaded: false,
            model_ready: false,
            model_path: None,
            confidence_threshold: default_threshold(),
        }
    }
}

/// Body for `POST /rasa/train`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRequest {
    pub model_name: String,
}

/// Body for the predict/process/test endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

/// Classifier output for one utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub entities: Vec<EntitySpan>,
}

/// Generated RASA project artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Config,
    TrainingData,
    Domain,
    Stories,
}

impl Artifact {
    pub const ALL: [Artifact; 4] = [
        Artifact::Config,
        Artifact::TrainingData,
        Artifact::Domain,
        Artifact::Stories,
    ];

    /// Path segment under `/rasa`.
    pub fn path(self) -> &'static str {
        match self {
            Artifact::Config => "/rasa/config/generate",
            Artifact::TrainingData => "/rasa/training-data/generate",
            Artifact::Domain => "/rasa/domain/generate",
            Artifact::Stories => "/rasa/stories/generate",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Artifact::Config => "config",
            Artifact::TrainingData => "training data",
            Artifact::Domain => "domain",
            Artifact::Stories => "stories",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_falls_back() {
        let m: Model =
            serde_json::from_str(r#"{"id":1,"name":"m","status":"archived"}"#).unwrap();
        assert_eq!(m.status, ModelStatus::Unknown);
        assert_eq!(m.size_label(), "N/A");
    }

    #[test]
    fn size_label_in_megabytes() {
        let m = Model {
            id: 1,
            name: "model_20250806".into(),
            status: ModelStatus::Ready,
            file_size: Some(3 * 1024 * 1024 + 512 * 1024),
            created_at: None,
        };
        assert_eq!(m.size_label(), "3.50 MB");
    }

    #[test]
    fn rasa_status_default_threshold() {
        let s: RasaStatus = serde_json::from_str(r#"{"model_loaded":true}"#).unwrap();
        assert!(s.model_loaded);
        assert!((s.confidence_threshold - 0.7).abs() < f64::EPSILON);
    }
}
