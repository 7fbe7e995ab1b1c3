//! Blocking HTTP gateway to the homevoice REST backend.
//!
//! Every endpoint answers with the `{success, data, error?, pagination?}`
//! envelope. The gateway joins the configured base URL with a resource path,
//! drops empty query parameters, and maps every failure onto [`ClientError`].

use crate::error::ClientError;
use homevoice_types::Envelope;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway construction parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Query parameters as `(name, value)` pairs; empty values are skipped.
pub type Query<'q> = &'q [(&'q str, String)];

/// Shared REST client. Stateless apart from configuration, so it is shared
/// across worker threads as `Arc<Gateway>`.
pub struct Gateway {
    http: Client,
    base: String,
    timeout: Duration,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Result<Self, ClientError> {
        let base = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base).map_err(|e| ClientError::InvalidBaseUrl {
            url: config.base_url.clone(),
            message: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Transport {
                status: None,
                url: base.clone(),
                body: e.to_string(),
            })?;

        Ok(Self {
            http,
            base,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL for `path` with non-empty query parameters appended.
    pub fn url_for(&self, path: &str, query: Query<'_>) -> Result<Url, ClientError> {
        let joined = if path.starts_with('/') {
            format!("{}{path}", self.base)
        } else {
            format!("{}/{path}", self.base)
        };
        let mut url = Url::parse(&joined).map_err(|e| ClientError::InvalidBaseUrl {
            url: joined.clone(),
            message: e.to_string(),
        })?;
        let mut params = query.iter().filter(|(_, v)| !v.is_empty()).peekable();
        if params.peek().is_some() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Send one request and decode the envelope.
    pub fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<&serde_json::Value>,
    ) -> Result<Envelope<T>, ClientError> {
        let (url, text) = self.send(method, path, query, body)?;
        let envelope: Envelope<T> =
            serde_json::from_str(&text).map_err(|e| ClientError::Decode {
                url: url.clone(),
                message: e.to_string(),
            })?;

        if !envelope.success {
            let message = envelope
                .error
                .clone()
                .unwrap_or_else(|| "request unsuccessful".to_string());
            warn!(url = %url, error = %message, "Backend rejected request");
            return Err(ClientError::Rejected { url, message });
        }
        Ok(envelope)
    }

    /// GET whose body is any JSON document, envelope or not.
    pub fn probe(&self, path: &str) -> Result<serde_json::Value, ClientError> {
        let (url, text) = self.send(Method::GET, path, &[], None)?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ClientError::Decode {
            url,
            message: e.to_string(),
        })
    }

    /// Perform the HTTP exchange. Returns the final URL and the 2xx body.
    fn send(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<&serde_json::Value>,
    ) -> Result<(String, String), ClientError> {
        let url = self.url_for(path, query)?;
        let url_str = url.to_string();
        debug!(method = %method, url = %url_str, "Sending request");

        let mut builder = self.http.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().map_err(|e| self.send_error(e, &url_str))?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            warn!(status = status.as_u16(), url = %url_str, body = %body, "Request failed");
            return Err(ClientError::Transport {
                status: Some(status.as_u16()),
                url: url_str,
                body,
            });
        }

        let text = resp.text().map_err(|e| self.send_error(e, &url_str))?;
        debug!(status = status.as_u16(), url = %url_str, "Request succeeded");
        Ok((url_str, text))
    }

    fn send_error(&self, e: reqwest::Error, url: &str) -> ClientError {
        if e.is_timeout() {
            warn!(url = %url, after_secs = self.timeout.as_secs(), "Request timed out");
            ClientError::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }
        } else {
            warn!(url = %url, error = %e, "Request failed");
            ClientError::Transport {
                status: e.status().map(|s| s.as_u16()),
                url: url.to_string(),
                body: e.to_string(),
            }
        }
    }

    // ── typed helpers used by the resource modules ─────────────────────────

    pub(crate) fn get_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query<'_>,
    ) -> Result<Envelope<T>, ClientError> {
        self.request(Method::GET, path, query, None)
    }

    pub(crate) fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let env = self.get_envelope(path, &[])?;
        self.require(path, env)
    }

    pub(crate) fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query<'_>,
    ) -> Result<T, ClientError> {
        let env = self.get_envelope(path, query)?;
        self.require(path, env)
    }

    pub(crate) fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let value = to_body(body)?;
        let env = self.request(Method::POST, path, &[], Some(&value))?;
        self.require(path, env)
    }

    /// POST for a create. Any 2xx `success` envelope confirms the write; the
    /// echoed record is returned only when `data` is present and decodes.
    pub(crate) fn post_saved<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, ClientError> {
        let value = to_body(body)?;
        let env: Envelope<serde_json::Value> =
            self.request(Method::POST, path, &[], Some(&value))?;
        Ok(echoed(path, env))
    }

    /// PUT counterpart of [`Gateway::post_saved`].
    pub(crate) fn put_saved<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, ClientError> {
        let value = to_body(body)?;
        let env: Envelope<serde_json::Value> =
            self.request(Method::PUT, path, &[], Some(&value))?;
        Ok(echoed(path, env))
    }

    /// POST that carries a body but whose `data` shape is backend-defined.
    pub(crate) fn post_value<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value, ClientError> {
        let value = to_body(body)?;
        let env: Envelope<serde_json::Value> =
            self.request(Method::POST, path, &[], Some(&value))?;
        Ok(env.data.unwrap_or(serde_json::Value::Null))
    }

    /// Bodiless POST (load, toggle, reload, initialize).
    pub(crate) fn post_empty(&self, path: &str) -> Result<serde_json::Value, ClientError> {
        let env: Envelope<serde_json::Value> = self.request(Method::POST, path, &[], None)?;
        Ok(env.data.unwrap_or(serde_json::Value::Null))
    }

    pub(crate) fn delete(&self, path: &str) -> Result<(), ClientError> {
        let _: Envelope<serde_json::Value> = self.request(Method::DELETE, path, &[], None)?;
        Ok(())
    }

    fn require<T>(&self, path: &str, env: Envelope<T>) -> Result<T, ClientError> {
        env.data.ok_or_else(|| ClientError::Decode {
            url: format!("{}{path}", self.base),
            message: "envelope has no data".to_string(),
        })
    }
}

fn echoed<T: DeserializeOwned>(path: &str, env: Envelope<serde_json::Value>) -> Option<T> {
    match env.data {
        None | Some(serde_json::Value::Null) => None,
        Some(data) => match serde_json::from_value(data) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(path, error = %e, "Saved record not echoed in a known shape");
                None
            }
        },
    }
}

fn to_body<B: Serialize>(body: &B) -> Result<serde_json::Value, ClientError> {
    serde_json::to_value(body).map_err(|e| ClientError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> Gateway {
        Gateway::new(GatewayConfig {
            base_url: base.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn defaults_match_backend() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.base_url, "http://localhost:5000/api");
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }

    #[test]
    fn joins_path_keeping_prefix() {
        let gw = gateway("http://localhost:5000/api/");
        let url = gw.url_for("/training/data", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/training/data");
        let url = gw.url_for("health", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/health");
    }

    #[test]
    fn skips_empty_query_values() {
        let gw = gateway(DEFAULT_BASE_URL);
        let url = gw
            .url_for(
                "/devices",
                &[("type", "light".into()), ("location", String::new()), ("search", "客厅".into())],
            )
            .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("type".to_string(), "light".to_string()),
                ("search".to_string(), "客厅".to_string())
            ]
        );
    }

    #[test]
    fn no_query_string_when_all_empty() {
        let gw = gateway(DEFAULT_BASE_URL);
        let url = gw.url_for("/devices", &[("type", String::new())]).unwrap();
        assert!(url.query().is_none());
    }

    #[test]
    fn rejects_malformed_base_url() {
        let err = Gateway::new(GatewayConfig {
            base_url: "not a url".into(),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, ClientError::InvalidBaseUrl { .. }));
    }
}
