//! In-process [`WidgetApi`] for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use snop_core::models::{
    ChatRequest, ChatResponse, DownloadRequest, HistoryRecord, HistoryResponse, MessageType,
};
use snop_core::RelayError;

use crate::api::WidgetApi;

pub struct FakeApi {
    answer: Option<ChatResponse>,
    history: Option<Vec<HistoryRecord>>,
    download: Option<Bytes>,
    chat_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl FakeApi {
    fn base() -> Self {
        Self {
            answer: None,
            history: None,
            download: None,
            chat_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with a backend 500.
    pub fn failing() -> Self {
        Self::base()
    }

    pub fn answering(answer: ChatResponse) -> Self {
        Self {
            answer: Some(answer),
            history: Some(Vec::new()),
            ..Self::base()
        }
    }

    pub fn with_history(history: Vec<HistoryRecord>) -> Self {
        Self {
            history: Some(history),
            ..Self::answering(Self::sample_answer())
        }
    }

    pub fn downloading(bytes: &'static [u8]) -> Self {
        Self {
            download: Some(Bytes::from_static(bytes)),
            ..Self::base()
        }
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn sample_answer() -> ChatResponse {
        serde_json::from_value(json!({
            "answer_text": "Top categories last quarter",
            "sql": "SELECT category, SUM(amount) AS amount FROM fact_sales GROUP BY 1",
            "rows": [{"category": "A", "amount": 100}],
            "columns": ["category", "amount"],
            "row_count": 1,
            "chart_suggestion": "bar",
            "execution_time": 0.42,
            "cached": false
        }))
        .unwrap()
    }

    pub fn record(id: &str, kind: MessageType, content: &str, sql: Option<&str>) -> HistoryRecord {
        HistoryRecord {
            message_id: id.to_string(),
            message_type: kind,
            content: content.to_string(),
            created_at: Some("2025-05-01T09:30:00".to_string()),
            sql_query: sql.map(str::to_string),
            execution_time: sql.map(|_| 0.12),
            cached: sql.map(|_| true),
        }
    }

    fn server_error() -> RelayError {
        RelayError::Backend {
            status: 500,
            message: "An error occurred".to_string(),
        }
    }
}

#[async_trait]
impl WidgetApi for FakeApi {
    async fn post_chat(&self, _request: &ChatRequest) -> Result<ChatResponse, RelayError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().ok_or_else(Self::server_error)
    }

    async fn get_history(&self, session_id: &str) -> Result<HistoryResponse, RelayError> {
        let messages = self.history.clone().ok_or_else(Self::server_error)?;
        Ok(HistoryResponse {
            session_id: Some(session_id.to_string()),
            messages,
        })
    }

    async fn delete_history(&self, _session_id: &str) -> Result<(), RelayError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.history.is_some() {
            Ok(())
        } else {
            Err(Self::server_error())
        }
    }

    async fn download(&self, request: &DownloadRequest) -> Result<Bytes, RelayError> {
        request.validate()?;
        self.download.clone().ok_or_else(Self::server_error)
    }
}
