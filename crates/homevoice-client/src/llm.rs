//! `/llm/*`: fallback-layer provider configuration.

use crate::error::ClientError;
use crate::gateway::Gateway;
use homevoice_types::llm::{LlmConfig, LlmConfigInput, LlmStatus, LlmTestResult, Provider};
use homevoice_types::model::TextRequest;

pub struct LlmApi<'a> {
    pub(crate) gw: &'a Gateway,
}

impl LlmApi<'_> {
    pub fn list(&self) -> Result<Vec<LlmConfig>, ClientError> {
        self.gw.get("/llm/configs")
    }

    pub fn create(&self, input: &LlmConfigInput) -> Result<Option<LlmConfig>, ClientError> {
        self.gw.post_saved("/llm/configs", input)
    }

    pub fn update(&self, id: i64, input: &LlmConfigInput) -> Result<Option<LlmConfig>, ClientError> {
        self.gw.put_saved(&format!("/llm/configs/{id}"), input)
    }

    pub fn delete(&self, id: i64) -> Result<(), ClientError> {
        self.gw.delete(&format!("/llm/configs/{id}"))
    }

    /// Flip the active flag of one config.
    pub fn toggle(&self, id: i64) -> Result<serde_json::Value, ClientError> {
        self.gw.post_empty(&format!("/llm/configs/{id}/toggle"))
    }

    pub fn test(&self, text: &str) -> Result<LlmTestResult, ClientError> {
        self.gw.post(
            "/llm/test",
            &TextRequest {
                text: text.to_string(),
            },
        )
    }

    pub fn fallback(&self, text: &str) -> Result<serde_json::Value, ClientError> {
        self.gw.post_value(
            "/llm/fallback",
            &TextRequest {
                text: text.to_string(),
            },
        )
    }

    pub fn providers(&self) -> Result<Vec<Provider>, ClientError> {
        self.gw.get("/llm/providers")
    }

    pub fn status(&self) -> Result<LlmStatus, ClientError> {
        self.gw.get("/llm/status")
    }

    pub fn reload(&self) -> Result<serde_json::Value, ClientError> {
        self.gw.post_empty("/llm/reload")
    }
}
