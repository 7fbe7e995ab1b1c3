//! `/chat/*`: message handling and persisted history.

use crate::error::ClientError;
use crate::gateway::Gateway;
use crate::Page;
use homevoice_types::chat::{
    ChatReply, ChatRequest, ChatStatistics, HistoryEntry, HistoryQuery, SessionSummary,
};
use homevoice_types::model::{Prediction, TextRequest};

pub struct ChatApi<'a> {
    pub(crate) gw: &'a Gateway,
}

impl ChatApi<'_> {
    pub fn send(&self, req: &ChatRequest) -> Result<ChatReply, ClientError> {
        self.gw.post("/chat/message", req)
    }

    pub fn predict_intent(&self, text: &str) -> Result<Prediction, ClientError> {
        self.gw.post(
            "/chat/intent/predict",
            &TextRequest {
                text: text.to_string(),
            },
        )
    }

    pub fn history(&self, q: &HistoryQuery) -> Result<Page<HistoryEntry>, ClientError> {
        let query = [
            ("session_id", q.session_id.clone().unwrap_or_default()),
            ("page", q.page.to_string()),
            ("per_page", q.per_page.to_string()),
        ];
        let env = self.gw.get_envelope("/chat/history", &query)?;
        Ok(Page::from_envelope(env))
    }

    pub fn sessions(&self) -> Result<Vec<SessionSummary>, ClientError> {
        self.gw.get("/chat/sessions")
    }

    /// Delete the backend's persisted history for one session.
    pub fn clear_session(&self, session_id: &str) -> Result<(), ClientError> {
        self.gw.delete(&format!("/chat/history/{session_id}"))
    }

    pub fn statistics(&self) -> Result<ChatStatistics, ClientError> {
        self.gw.get("/chat/statistics")
    }
}
