//! HTTP client for the chat API.
//!
//! The same client shape serves both hops of the system:
//! - the relay talks to the text-to-SQL backend under `/api/v1`
//! - the widget talks to the relay under `/api`
//!
//! Every call is a single attempt. Non-success statuses become
//! [`RelayError::Backend`], network failures and timeouts become
//! [`RelayError::Transport`]. Nothing is retried and nothing is cached.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::BackendConfig;
use crate::error::RelayError;
use crate::models::{ChatRequest, DownloadRequest};

/// Path prefix of the backend's versioned API.
pub const UPSTREAM_PREFIX: &str = "/api/v1";

/// Path prefix of the relay's API.
pub const RELAY_PREFIX: &str = "/api";

/// Unreserved characters stay as-is; everything else is escaped so a session
/// id always occupies exactly one path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    prefix: String,
}

impl BackendClient {
    /// Client for the upstream backend described by `config`.
    pub fn new(config: &BackendConfig) -> Result<Self, RelayError> {
        Self::with_base_url(config.base_url.clone(), UPSTREAM_PREFIX, config.timeout())
    }

    /// Create a client with a custom base URL and path prefix (relay, tests).
    pub fn with_base_url(
        base_url: impl Into<String>,
        prefix: &str,
        timeout: Duration,
    ) -> Result<Self, RelayError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            prefix: prefix.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.prefix, path)
    }

    /// `POST {prefix}/chat`. Blank questions are rejected locally.
    pub async fn post_chat<T: DeserializeOwned>(
        &self,
        request: &ChatRequest,
    ) -> Result<T, RelayError> {
        request.validate()?;
        let url = self.url("/chat");
        tracing::debug!("Forwarding chat request to {}", url);

        let resp = self.client.post(&url).json(request).send().await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    /// `GET {prefix}/chat/history/{id}`, always bypassing caches.
    pub async fn get_history<T: DeserializeOwned>(
        &self,
        session_id: &str,
    ) -> Result<T, RelayError> {
        let url = self.url(&history_path(session_id)?);
        tracing::debug!("Fetching chat history from {}", url);

        let resp = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    /// `DELETE {prefix}/chat/history/{id}`.
    pub async fn delete_history<T: DeserializeOwned>(
        &self,
        session_id: &str,
    ) -> Result<T, RelayError> {
        let url = self.url(&history_path(session_id)?);
        tracing::debug!("Deleting chat history at {}", url);

        let resp = self
            .client
            .delete(&url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    /// `POST {prefix}/download/{format}`. Blank SQL is rejected locally. The
    /// successful response is handed back untouched so the caller can stream
    /// its body.
    pub async fn download(&self, request: &DownloadRequest) -> Result<Response, RelayError> {
        request.validate()?;
        let url = self.url(&format!("/download/{}", request.format.as_str()));
        tracing::debug!("Requesting {} export from {}", request.format.as_str(), url);

        let resp = self.client.post(&url).json(request).send().await?;
        ensure_success(resp).await
    }

    /// `GET /health` on the base URL (no prefix).
    pub async fn health(&self) -> Result<Value, RelayError> {
        let url = format!("{}/health", self.base_url);
        let resp = self.client.get(&url).send().await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<Value>().await.unwrap_or_else(|_| serde_json::json!({})))
    }
}

fn history_path(session_id: &str) -> Result<String, RelayError> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(RelayError::Validation("sessionId is required".to_string()));
    }
    Ok(format!(
        "/chat/history/{}",
        utf8_percent_encode(session_id, SEGMENT)
    ))
}

async fn ensure_success(resp: Response) -> Result<Response, RelayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = error_message(&body);
    tracing::warn!("Backend returned {}: {}", status, message);
    Err(RelayError::Backend {
        status: status.as_u16(),
        message,
    })
}

/// Pull a human message out of an error body: `detail`, then `error`, then the
/// raw text.
pub fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "error"] {
            match value.get(key) {
                Some(Value::String(s)) => return s.clone(),
                Some(Value::Null) | None => {}
                Some(other) => return other.to_string(),
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatResponse, ExportFormat, HistoryResponse};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> BackendClient {
        BackendClient::with_base_url(server.uri(), UPSTREAM_PREFIX, Duration::from_secs(5))
            .expect("Failed to create client")
    }

    fn sample_answer() -> Value {
        json!({
            "answer_text": "Top 5 categories",
            "sql": "SELECT category, amount FROM fact_sales",
            "rows": [{"category": "A", "amount": 100}],
            "columns": ["category", "amount"],
            "row_count": 1,
            "chart_suggestion": "bar",
            "execution_time": 0.42,
            "cached": false
        })
    }

    #[tokio::test]
    async fn test_post_chat_forwards_json_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "question": "지난 분기 카테고리별 매출 Top 5",
                "wants_visualization": false,
                "session_id": "s-1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_answer()))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let req = ChatRequest::new("지난 분기 카테고리별 매출 Top 5").with_session("s-1");
        let resp: ChatResponse = client.post_chat(&req).await.unwrap();
        assert_eq!(resp.row_count, 1);
        assert_eq!(resp.columns, vec!["category", "amount"]);
    }

    #[tokio::test]
    async fn test_post_chat_backend_error_carries_status_and_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"detail": "SQL failed"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .post_chat::<Value>(&ChatRequest::new("q"))
            .await
            .unwrap_err();
        match err {
            RelayError::Backend { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "SQL failed");
            }
            other => panic!("Expected Backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_post_chat_blank_question_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_answer()))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .post_chat::<Value>(&ChatRequest::new("   "))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let client =
            BackendClient::with_base_url("http://127.0.0.1:1", UPSTREAM_PREFIX, Duration::from_secs(2))
                .unwrap();
        let err = client
            .post_chat::<Value>(&ChatRequest::new("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_slow_backend_times_out_as_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(sample_answer())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client =
            BackendClient::with_base_url(server.uri(), UPSTREAM_PREFIX, Duration::from_millis(200))
                .unwrap();
        let err = client
            .post_chat::<Value>(&ChatRequest::new("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)));
    }

    #[tokio::test]
    async fn test_get_history_bypasses_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/chat/history/s-1"))
            .and(header("cache-control", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "session_id": "s-1",
                "messages": [
                    {"message_id": 1, "message_type": "user", "content": "q",
                     "created_at": "2025-05-01T09:30:00"}
                ]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server);
        for _ in 0..2 {
            let history: HistoryResponse = client.get_history("s-1").await.unwrap();
            assert_eq!(history.messages.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_get_history_keeps_records_around_unknown_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/chat/history/s-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "session_id": "s-1",
                "messages": [
                    {"message_id": 1, "message_type": "user", "content": "q"},
                    {"message_id": 2, "message_type": "system", "content": "notice"},
                    {"message_id": 3, "message_type": "ai", "content": "a",
                     "sql_query": "SELECT 1"}
                ]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let history: HistoryResponse = client.get_history("s-1").await.unwrap();
        let ids: Vec<&str> = history.messages.iter().map(|r| r.message_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_history_requires_session_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messages": []})))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert!(client.get_history::<Value>("").await.unwrap_err().is_validation());
        assert!(client.get_history::<Value>("  ").await.unwrap_err().is_validation());
        assert!(client.delete_history::<Value>("").await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_delete_history_returns_ack() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/chat/history/s-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "deleted"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let ack: Value = client.delete_history("s-1").await.unwrap();
        assert_eq!(ack["message"], "deleted");
    }

    #[tokio::test]
    async fn test_download_returns_bytes_unchanged() {
        let server = MockServer::start().await;
        let payload: Vec<u8> = vec![0x50, 0x4b, 0x03, 0x04, 0x00, 0xff, 0x10];
        Mock::given(method("POST"))
            .and(path("/api/v1/download/xlsx"))
            .and(body_json(json!({"sql": "SELECT 1", "format": "xlsx"})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let resp = client
            .download(&DownloadRequest::new("SELECT 1", ExportFormat::Xlsx))
            .await
            .unwrap();
        assert_eq!(resp.bytes().await.unwrap().to_vec(), payload);
    }

    #[tokio::test]
    async fn test_download_no_data_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/download/csv"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "no data"})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .download(&DownloadRequest::new("SELECT 1", ExportFormat::Csv))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Backend { status: 404, .. }));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"detail": "bad sql"}"#), "bad sql");
        assert_eq!(error_message(r#"{"error": "relay down", "detail": null}"#), "relay down");
        assert_eq!(error_message(r#"{"detail": [{"loc": 1}]}"#), r#"[{"loc":1}]"#);
        assert_eq!(error_message("  plain text "), "plain text");
        assert_eq!(error_message(""), "empty response body");
    }

    #[test]
    fn test_history_path_encodes_segment() {
        assert_eq!(history_path("s-1").unwrap(), "/chat/history/s-1");
        assert_eq!(history_path("a b/c").unwrap(), "/chat/history/a%20b%2Fc");
    }
}
