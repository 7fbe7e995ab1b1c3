//! Chat session types.

use crate::training::EntitySpan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bot text shown in place of a reply when the backend call fails.
pub const APOLOGY: &str = "抱歉，系统出现错误，请稍后再试";

/// Phrases the chat view can cycle into its input.
pub const QUICK_PHRASES: &[&str] = &[
    "你好",
    "打开客厅灯",
    "关闭空调",
    "调亮一点",
    "把温度调到26度",
    "打开窗帘",
    "再见",
];

/// Model tag the backend reports when the classifier handled the turn.
pub const RASA_MODEL: &str = "rasa";
/// Prefix of model tags for LLM-handled turns (`llm_openai`, ...).
pub const LLM_MODEL_PREFIX: &str = "llm_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry in the in-memory chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Client-generated millisecond id, strictly increasing within a log.
    pub id: i64,
    pub sender: Sender,
    pub text: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub entities: Vec<EntitySpan>,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub error: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            sender: Sender::User,
            text: text.into(),
            intent: None,
            confidence: None,
            entities: Vec::new(),
            model_used: None,
            error: false,
            timestamp: Utc::now(),
        }
    }

    pub fn bot(id: i64, reply: ChatReply) -> Self {
        Self {
            id,
            sender: Sender::Bot,
            text: reply.response,
            intent: reply.intent,
            confidence: reply.confidence,
            entities: reply.entities,
            model_used: reply.model_used,
            error: false,
            timestamp: Utc::now(),
        }
    }

    /// The fixed error bubble appended when a send fails.
    pub fn apology(id: i64) -> Self {
        Self {
            id,
            sender: Sender::Bot,
            text: APOLOGY.to_string(),
            intent: None,
            confidence: None,
            entities: Vec::new(),
            model_used: None,
            error: true,
            timestamp: Utc::now(),
        }
    }

    pub fn handled_by_rasa(&self) -> bool {
        self.model_used.as_deref() == Some(RASA_MODEL)
    }

    pub fn handled_by_llm(&self) -> bool {
        self.model_used
            .as_deref()
            .is_some_and(|m| m.starts_with(LLM_MODEL_PREFIX))
    }
}

/// Body for `POST /chat/message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    pub session_id: String,
}

/// Reply payload of `POST /chat/message`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub entities: Vec<EntitySpan>,
    #[serde(default)]
    pub model_used: Option<String>,
}

/// Query parameters for `GET /chat/history`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub session_id: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            session_id: None,
            page: 1,
            per_page: 20,
        }
    }
}

/// A persisted conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub user_message: String,
    #[serde(default)]
    pub bot_response: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// An entry of `GET /chat/sessions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default, alias = "count")]
    pub message_count: u64,
    #[serde(default)]
    pub last_activity: Option<String>,
}

/// `GET /chat/statistics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatStatistics {
    #[serde(default)]
    pub total_conversations: u64,
    #[serde(default)]
    pub total_sessions: Option<u64>,
    #[serde(default)]
    pub average_confidence: Option<f64>,
    #[serde(default)]
    pub model_distribution: BTreeMap<String, u64>,
}

impl ChatStatistics {
    /// Average confidence as a percentage with one decimal, or `N/A`.
    pub fn confidence_label(&self) -> String {
        match self.average_confidence {
            Some(c) if c > 0.0 => format!("{:.1}%", c * 100.0),
            _ => "N/A".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_without_entities_decodes() {
        let reply: ChatReply = serde_json::from_str(
            r#"{"response":"好的，已为您打开客厅灯","intent":"turn_on_light","confidence":0.93,"model_used":"rasa"}"#,
        )
        .unwrap();
        let msg = ChatMessage::bot(2, reply);
        assert_eq!(msg.sender, Sender::Bot);
        assert!(msg.handled_by_rasa());
        assert!(!msg.handled_by_llm());
        assert!(msg.entities.is_empty());
    }

    #[test]
    fn apology_is_flagged() {
        let msg = ChatMessage::apology(9);
        assert!(msg.error);
        assert_eq!(msg.text, APOLOGY);
        assert!(msg.model_used.is_none());
    }

    #[test]
    fn llm_prefix_detection() {
        let mut msg = ChatMessage::user(1, "讲个笑话");
        msg.model_used = Some("llm_qwen".into());
        assert!(msg.handled_by_llm());
        msg.model_used = Some("llm".into());
        assert!(!msg.handled_by_llm());
    }

    #[test]
    fn confidence_label_formats_percent() {
        let stats = ChatStatistics {
            average_confidence: Some(0.8567),
            ..Default::default()
        };
        assert_eq!(stats.confidence_label(), "85.7%");
        assert_eq!(ChatStatistics::default().confidence_label(), "N/A");
    }
}
