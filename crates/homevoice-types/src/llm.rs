//! LLM fallback-layer configuration types.

use serde::{Deserialize, Serialize};

/// Priority assigned when the form value does not parse.
pub const DEFAULT_PRIORITY: i64 = 10;

/// A configured LLM provider integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub id: i64,
    pub provider: String,
    pub model_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    pub is_active: bool,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

/// Create/update payload for an LLM config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfigInput {
    pub provider: String,
    pub model_name: String,
    pub api_key: String,
    pub base_url: String,
    pub is_active: bool,
    pub priority: i64,
}

impl Default for LlmConfigInput {
    fn default() -> Self {
        Self {
            provider: String::new(),
            model_name: String::new(),
            api_key: String::new(),
            base_url: String::new(),
            is_active: true,
            priority: DEFAULT_PRIORITY,
        }
    }
}

impl From<&LlmConfig> for LlmConfigInput {
    fn from(c: &LlmConfig) -> Self {
        Self {
            provider: c.provider.clone(),
            model_name: c.model_name.clone(),
            api_key: c.api_key.clone(),
            base_url: c.base_url.clone(),
            is_active: c.is_active,
            priority: c.priority,
        }
    }
}

/// A vendor the backend knows how to talk to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub default_base_url: Option<String>,
    #[serde(default)]
    pub models: Vec<String>,
}

impl Provider {
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

/// `GET /llm/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmStatus {
    #[serde(default)]
    pub active_configs_count: u64,
    #[serde(default)]
    pub total_configs: Option<u64>,
    #[serde(default)]
    pub active_providers: Vec<String>,
}

/// Result of `POST /llm/test`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmTestResult {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default, alias = "model_used")]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Mask an API key for display, keeping the last four characters.
pub fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        return "\u{2022}".repeat(count);
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("{}{tail}", "\u{2022}".repeat(count - 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_priority_defaults_to_ten() {
        let c: LlmConfig = serde_json::from_str(
            r#"{"id":3,"provider":"openai","model_name":"gpt-4o","is_active":true}"#,
        )
        .unwrap();
        assert_eq!(c.priority, DEFAULT_PRIORITY);
        assert!(c.api_key.is_empty());
    }

    #[test]
    fn masks_all_but_tail() {
        assert_eq!(mask_key("sk-abcdef1234"), format!("{}1234", "\u{2022}".repeat(9)));
        assert_eq!(mask_key("abc"), "\u{2022}".repeat(3));
    }

    #[test]
    fn provider_label_prefers_display_name() {
        let p = Provider {
            name: "qwen".into(),
            display_name: "通义千问".into(),
            default_base_url: None,
            models: vec![],
        };
        assert_eq!(p.label(), "通义千问");
    }
}
