//! Client error type.

use std::time::Duration;

/// Error returned by every gateway and resource call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Non-2xx response (status set) or a network failure (status `None`).
    #[error("request to {url} failed{}: {body}", status_suffix(.status))]
    Transport {
        status: Option<u16>,
        url: String,
        body: String,
    },
    /// No response within the configured ceiling.
    #[error("request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
    /// Input rejected locally before any request was sent.
    #[error("invalid input: {0}")]
    Validation(String),
    /// 2xx response whose body is not the expected envelope.
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
    /// 2xx envelope carrying `success: false`.
    #[error("{url} rejected the request: {message}")]
    Rejected { url: String, message: String },
    #[error("invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl ClientError {
    /// HTTP status of a transport failure, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }

    /// Short human-readable detail for alerts.
    ///
    /// Prefers the backend's `error` field when the body is an envelope.
    pub fn detail(&self) -> String {
        match self {
            ClientError::Transport { status, body, .. } => {
                let backend = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from));
                match (backend, status) {
                    (Some(msg), _) => msg,
                    (None, Some(code)) if body.trim().is_empty() => format!("HTTP {code}"),
                    (None, _) => body.clone(),
                }
            }
            ClientError::Timeout { after, .. } => format!("timed out after {}s", after.as_secs()),
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Decode { message, .. } => message.clone(),
            ClientError::Rejected { message, .. } => message.clone(),
            ClientError::InvalidBaseUrl { message, .. } => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_includes_status() {
        let err = ClientError::Transport {
            status: Some(404),
            url: "http://localhost:5000/api/rasa/models/9".into(),
            body: r#"{"success":false,"error":"model not found"}"#.into(),
        };
        assert!(err.to_string().contains("(HTTP 404)"));
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.detail(), "model not found");
    }

    #[test]
    fn network_failure_has_no_status() {
        let err = ClientError::Transport {
            status: None,
            url: "http://localhost:5000/api/health".into(),
            body: "connection refused".into(),
        };
        assert!(!err.to_string().contains("HTTP"));
        assert_eq!(err.detail(), "connection refused");
    }

    #[test]
    fn empty_body_falls_back_to_status() {
        let err = ClientError::Transport {
            status: Some(502),
            url: "u".into(),
            body: String::new(),
        };
        assert_eq!(err.detail(), "HTTP 502");
    }
}
