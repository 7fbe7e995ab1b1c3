//! `/training/*`: training examples, intents, entities and statistics.

use crate::error::ClientError;
use crate::gateway::Gateway;
use crate::Page;
use homevoice_types::training::{
    EntityDef, ExampleQuery, ImportFormat, ImportRequest, IntentDef, LabelInput, TrainingExample,
    TrainingExampleInput, TrainingStatistics,
};
use tracing::debug;

/// Training-data operations, borrowed from a [`Gateway`].
pub struct TrainingApi<'a> {
    pub(crate) gw: &'a Gateway,
}

impl TrainingApi<'_> {
    pub fn list(&self, q: &ExampleQuery) -> Result<Page<TrainingExample>, ClientError> {
        let query = [
            ("page", q.page.to_string()),
            ("per_page", q.per_page.to_string()),
            ("intent", q.intent.clone().unwrap_or_default()),
            ("search", q.search.clone().unwrap_or_default()),
        ];
        let env = self.gw.get_envelope("/training/data", &query)?;
        Ok(Page::from_envelope(env))
    }

    /// `Ok(None)` when the backend confirms without echoing the example.
    pub fn create(
        &self,
        input: &TrainingExampleInput,
    ) -> Result<Option<TrainingExample>, ClientError> {
        self.gw.post_saved("/training/data", input)
    }

    pub fn update(
        &self,
        id: i64,
        input: &TrainingExampleInput,
    ) -> Result<Option<TrainingExample>, ClientError> {
        self.gw.put_saved(&format!("/training/data/{id}"), input)
    }

    pub fn delete(&self, id: i64) -> Result<(), ClientError> {
        self.gw.delete(&format!("/training/data/{id}"))
    }

    pub fn import(&self, req: &ImportRequest) -> Result<serde_json::Value, ClientError> {
        self.gw.post_value("/training/data/import", req)
    }

    /// Parse `raw` locally and import it. Malformed JSON fails with
    /// [`ClientError::Validation`] before any request is sent.
    pub fn import_json(&self, raw: &str) -> Result<serde_json::Value, ClientError> {
        let data = parse_import_json(raw)?;
        self.import(&ImportRequest {
            format: ImportFormat::Json,
            data,
        })
    }

    pub fn import_csv(&self, raw: &str) -> Result<serde_json::Value, ClientError> {
        self.import(&ImportRequest {
            format: ImportFormat::Csv,
            data: serde_json::Value::String(raw.to_string()),
        })
    }

    pub fn export(&self, format: &str) -> Result<serde_json::Value, ClientError> {
        self.gw
            .get_query("/training/data/export", &[("format", format.to_string())])
    }

    // ── intents ──

    pub fn intents(&self) -> Result<Vec<IntentDef>, ClientError> {
        self.gw.get("/training/intents")
    }

    pub fn create_intent(&self, input: &LabelInput) -> Result<Option<IntentDef>, ClientError> {
        self.gw.post_saved("/training/intents", input)
    }

    pub fn update_intent(&self, id: i64, input: &LabelInput) -> Result<Option<IntentDef>, ClientError> {
        self.gw.put_saved(&format!("/training/intents/{id}"), input)
    }

    pub fn delete_intent(&self, id: i64) -> Result<(), ClientError> {
        self.gw.delete(&format!("/training/intents/{id}"))
    }

    // ── entities ──

    pub fn entities(&self) -> Result<Vec<EntityDef>, ClientError> {
        self.gw.get("/training/entities")
    }

    pub fn create_entity(&self, input: &LabelInput) -> Result<Option<EntityDef>, ClientError> {
        self.gw.post_saved("/training/entities", input)
    }

    pub fn update_entity(&self, id: i64, input: &LabelInput) -> Result<Option<EntityDef>, ClientError> {
        self.gw.put_saved(&format!("/training/entities/{id}"), input)
    }

    pub fn delete_entity(&self, id: i64) -> Result<(), ClientError> {
        self.gw.delete(&format!("/training/entities/{id}"))
    }

    pub fn statistics(&self) -> Result<TrainingStatistics, ClientError> {
        self.gw.get("/training/statistics")
    }

    pub fn validate(&self) -> Result<serde_json::Value, ClientError> {
        self.gw.get("/training/validate")
    }
}

/// Bulk-import payloads must be JSON arrays or objects.
pub fn parse_import_json(raw: &str) -> Result<serde_json::Value, ClientError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ClientError::Validation(format!("invalid JSON: {e}")))?;
    if !(value.is_array() || value.is_object()) {
        return Err(ClientError::Validation(
            "import data must be a JSON array or object".to_string(),
        ));
    }
    debug!(
        rows = value.as_array().map(Vec::len).unwrap_or(1),
        "Parsed import payload"
    );
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_json_rejects_garbage() {
        let err = parse_import_json("[{\"text\": \"你好\",").unwrap_err();
        assert!(matches!(err, ClientError::Validation(ref m) if m.starts_with("invalid JSON")));
    }

    #[test]
    fn import_json_rejects_scalars() {
        assert!(matches!(
            parse_import_json("42"),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn import_json_accepts_rows() {
        let v = parse_import_json(r#"[{"text":"你好","intent":"greet"}]"#).unwrap();
        assert_eq!(v.as_array().map(Vec::len), Some(1));
    }
}
