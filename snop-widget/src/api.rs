//! The widget's view of the relay.
//!
//! [`WidgetApi`] is the seam between widget logic and the network. The
//! production implementation, [`RelayApi`], talks to the relay's `/api`
//! surface; tests substitute their own.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use snop_core::config::WidgetConfig;
use snop_core::models::{ChatRequest, ChatResponse, DownloadRequest, HistoryResponse};
use snop_core::{BackendClient, RelayError, RELAY_PREFIX};

/// Operations the widget needs from the relay.
#[async_trait]
pub trait WidgetApi: Send + Sync {
    /// Ask one question.
    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatResponse, RelayError>;

    /// Read the stored history of a session.
    async fn get_history(&self, session_id: &str) -> Result<HistoryResponse, RelayError>;

    /// Delete the stored history of a session. The acknowledgement body is
    /// not interpreted.
    async fn delete_history(&self, session_id: &str) -> Result<(), RelayError>;

    /// Export the rows of `sql` in the requested format, fully buffered.
    async fn download(&self, request: &DownloadRequest) -> Result<Bytes, RelayError>;
}

/// [`WidgetApi`] over HTTP to a running relay.
#[derive(Debug, Clone)]
pub struct RelayApi {
    client: BackendClient,
}

impl RelayApi {
    pub fn new(config: &WidgetConfig) -> Result<Self, RelayError> {
        Self::with_base_url(config.relay_url.clone(), config.timeout())
    }

    pub fn with_base_url(
        relay_url: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, RelayError> {
        let client = BackendClient::with_base_url(relay_url, RELAY_PREFIX, timeout)?;
        Ok(Self { client })
    }

    pub fn relay_url(&self) -> &str {
        self.client.base_url()
    }

    /// Relay `/health` body (includes the upstream status).
    pub async fn health(&self) -> Result<Value, RelayError> {
        self.client.health().await
    }
}

#[async_trait]
impl WidgetApi for RelayApi {
    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatResponse, RelayError> {
        self.client.post_chat(request).await
    }

    async fn get_history(&self, session_id: &str) -> Result<HistoryResponse, RelayError> {
        self.client.get_history(session_id).await
    }

    async fn delete_history(&self, session_id: &str) -> Result<(), RelayError> {
        let _ack: Value = self.client.delete_history(session_id).await?;
        Ok(())
    }

    async fn download(&self, request: &DownloadRequest) -> Result<Bytes, RelayError> {
        let resp = self.client.download(request).await?;
        Ok(resp.bytes().await?)
    }
}
