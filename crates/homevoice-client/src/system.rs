use crate::error::ClientError;
use crate::gateway::Gateway;

pub struct SystemApi<'a> {
    pub(crate) gw: &'a Gateway,
}

impl SystemApi<'_> {
    /// `GET /health`. Any 2xx answer counts as healthy; the body is passed
    /// through unchanged.
    pub fn health(&self) -> Result<serde_json::Value, ClientError> {
        self.gw.probe("/health")
    }
}
