//! Typed blocking client for the homevoice REST backend.
//!
//! [`Gateway`] owns the HTTP client and configuration; each resource module
//! is a thin borrowed view over it:
//!
//! ```no_run
//! use homevoice_client::{Gateway, GatewayConfig};
//!
//! let gw = Gateway::new(GatewayConfig::default())?;
//! let stats = gw.training().statistics()?;
//! println!("{} examples", stats.total_training_data);
//! # Ok::<(), homevoice_client::ClientError>(())
//! ```

pub mod chat;
pub mod devices;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod models;
pub mod system;
pub mod training;

pub use error::ClientError;
pub use gateway::{Gateway, GatewayConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

use homevoice_types::{Envelope, Pagination};

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
}

impl<T> Page<T> {
    pub(crate) fn from_envelope(env: Envelope<Vec<T>>) -> Self {
        Self {
            items: env.data.unwrap_or_default(),
            pagination: env.pagination,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: None,
        }
    }
}

impl Gateway {
    pub fn training(&self) -> training::TrainingApi<'_> {
        training::TrainingApi { gw: self }
    }

    pub fn models(&self) -> models::ModelsApi<'_> {
        models::ModelsApi { gw: self }
    }

    pub fn llm(&self) -> llm::LlmApi<'_> {
        llm::LlmApi { gw: self }
    }

    pub fn devices(&self) -> devices::DevicesApi<'_> {
        devices::DevicesApi { gw: self }
    }

    pub fn chat(&self) -> chat::ChatApi<'_> {
        chat::ChatApi { gw: self }
    }

    pub fn system(&self) -> system::SystemApi<'_> {
        system::SystemApi { gw: self }
    }
}
