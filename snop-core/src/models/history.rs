use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::chat::ChatResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    User,
    Ai,
}

/// A backend-persisted message. Metadata only: result rows are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(deserialize_with = "id_as_string")]
    pub message_id: String,
    pub message_type: MessageType,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub sql_query: Option<String>,
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default)]
    pub cached: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(deserialize_with = "decodable_records")]
    pub messages: Vec<HistoryRecord>,
}

/// Records that do not decode (an unknown `message_type`, a missing field)
/// are dropped one by one so the rest of the history still loads.
fn decodable_records<'de, D>(deserializer: D) -> Result<Vec<HistoryRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping undecodable history record: {}", e);
                None
            }
        })
        .collect())
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unsupported message_id: {}",
            other
        ))),
    }
}

/// One entry of the conversation. Only `ai` messages carry `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ChatResponse>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: MessageType::User,
            content: content.into(),
            timestamp: Utc::now(),
            data: None,
        }
    }

    pub fn ai(response: ChatResponse) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: MessageType::Ai,
            content: response.answer_text.clone(),
            timestamp: Utc::now(),
            data: Some(response),
        }
    }

    pub fn is_user(&self) -> bool {
        self.kind == MessageType::User
    }

    /// Rebuild a message from history. `data` exists only when the record kept
    /// its SQL, and then holds no rows.
    pub fn from_history(record: HistoryRecord, loaded_at: DateTime<Utc>) -> Self {
        let timestamp = parse_timestamp(record.created_at.as_deref()).unwrap_or(loaded_at);
        let data = record.sql_query.map(|sql| ChatResponse {
            answer_text: record.content.clone(),
            sql,
            rows: Vec::new(),
            columns: Vec::new(),
            row_count: 0,
            chart_suggestion: None,
            execution_time: record.execution_time.unwrap_or(0.0),
            cached: record.cached.unwrap_or(false),
        });

        Self {
            id: record.message_id,
            kind: record.message_type,
            content: record.content,
            timestamp,
            data,
        }
    }
}

/// RFC 3339 first, then a naive ISO timestamp taken as UTC.
fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|n| n.and_utc()))
}
