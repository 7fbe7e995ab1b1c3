//! Training data, intent and entity definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A labeled span extracted from an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub entity: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

/// One training utterance as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub id: i64,
    pub text: String,
    pub intent: String,
    #[serde(default)]
    pub entities: Vec<EntitySpan>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Create/update payload for a training example.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingExampleInput {
    pub text: String,
    pub intent: String,
    #[serde(default)]
    pub entities: Vec<EntitySpan>,
}

impl From<&TrainingExample> for TrainingExampleInput {
    fn from(ex: &TrainingExample) -> Self {
        Self {
            text: ex.text.clone(),
            intent: ex.intent.clone(),
            entities: ex.entities.clone(),
        }
    }
}

/// Query parameters for `GET /training/data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleQuery {
    pub page: u32,
    pub per_page: u32,
    pub intent: Option<String>,
    pub search: Option<String>,
}

impl Default for ExampleQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
            intent: None,
            search: None,
        }
    }
}

/// An intent label definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDef {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "count")]
    pub example_count: Option<u64>,
}

/// An entity label definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "count")]
    pub example_count: Option<u64>,
}

/// Create/update payload shared by intents and entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Bulk import source format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    #[default]
    Json,
    Csv,
}

impl ImportFormat {
    pub fn label(self) -> &'static str {
        match self {
            ImportFormat::Json => "JSON",
            ImportFormat::Csv => "CSV",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            ImportFormat::Json => ImportFormat::Csv,
            ImportFormat::Csv => ImportFormat::Json,
        }
    }
}

/// Body for `POST /training/data/import`. JSON imports carry parsed rows,
/// CSV imports carry the raw text.
#[derive(Debug, Clone, Serialize)]
pub struct ImportRequest {
    #[serde(rename = "type")]
    pub format: ImportFormat,
    pub data: serde_json::Value,
}

/// `GET /training/statistics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStatistics {
    #[serde(default)]
    pub total_training_data: u64,
    #[serde(default)]
    pub total_intents: u64,
    #[serde(default)]
    pub total_entities: u64,
    #[serde(default)]
    pub intent_distribution: BTreeMap<String, u64>,
}

impl TrainingStatistics {
    /// The `n` most frequent intents, highest count first.
    pub fn top_intents(&self, n: usize) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .intent_distribution
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        entries.truncate(n);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_without_entities_decodes() {
        let json = r#"{"id":7,"text":"打开客厅灯","intent":"turn_on_light"}"#;
        let ex: TrainingExample = serde_json::from_str(json).unwrap();
        assert_eq!(ex.intent, "turn_on_light");
        assert!(ex.entities.is_empty());
        assert!(ex.created_at.is_none());
    }

    #[test]
    fn import_request_uses_type_key() {
        let req = ImportRequest {
            format: ImportFormat::Csv,
            data: serde_json::Value::String("text,intent\n你好,greet".into()),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "csv");
        assert!(json["data"].is_string());
    }

    #[test]
    fn top_intents_orders_by_count() {
        let mut stats = TrainingStatistics::default();
        stats.intent_distribution.insert("greet".into(), 3);
        stats.intent_distribution.insert("turn_on_light".into(), 9);
        stats.intent_distribution.insert("goodbye".into(), 3);
        let top = stats.top_intents(2);
        assert_eq!(top, vec![("turn_on_light", 9), ("goodbye", 3)]);
    }
}
