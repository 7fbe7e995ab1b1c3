//! `/rasa/*`: model lifecycle, prediction and artifact generation.

use crate::error::ClientError;
use crate::gateway::Gateway;
use homevoice_types::model::{Artifact, Model, Prediction, RasaStatus, TextRequest, TrainRequest};

pub struct ModelsApi<'a> {
    pub(crate) gw: &'a Gateway,
}

impl ModelsApi<'_> {
    pub fn list(&self) -> Result<Vec<Model>, ClientError> {
        self.gw.get("/rasa/models")
    }

    pub fn get(&self, id: i64) -> Result<Model, ClientError> {
        self.gw.get(&format!("/rasa/models/{id}"))
    }

    pub fn load(&self, id: i64) -> Result<serde_json::Value, ClientError> {
        self.gw.post_empty(&format!("/rasa/models/{id}/load"))
    }

    /// Start training. Blank names are rejected locally.
    pub fn train(&self, req: &TrainRequest) -> Result<serde_json::Value, ClientError> {
        if req.model_name.trim().is_empty() {
            return Err(ClientError::Validation("model name is required".to_string()));
        }
        self.gw.post_value("/rasa/train", req)
    }

    pub fn predict(&self, text: &str) -> Result<Prediction, ClientError> {
        self.gw.post("/rasa/predict", &text_body(text))
    }

    pub fn process(&self, text: &str) -> Result<serde_json::Value, ClientError> {
        self.gw.post_value("/rasa/process", &text_body(text))
    }

    pub fn test(&self, body: &serde_json::Value) -> Result<serde_json::Value, ClientError> {
        self.gw.post_value("/rasa/test", body)
    }

    pub fn test_single(&self, text: &str) -> Result<serde_json::Value, ClientError> {
        self.gw.post_value("/rasa/test/single", &text_body(text))
    }

    /// Generated RASA artifact, as returned by the backend.
    pub fn generate(&self, artifact: Artifact) -> Result<serde_json::Value, ClientError> {
        self.gw.get(artifact.path())
    }

    pub fn status(&self) -> Result<RasaStatus, ClientError> {
        self.gw.get("/rasa/status")
    }
}

fn text_body(text: &str) -> TextRequest {
    TextRequest {
        text: text.to_string(),
    }
}
