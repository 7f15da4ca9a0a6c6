use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;

/// One result cell. Rows are bags of these keyed by column name; column order
/// always comes from [`ChatResponse::columns`], never from the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum CellValue {
    Null,
    /// Kept as the original JSON number so integers stay integers on the way back out.
    Number(serde_json::Number),
    Text(String),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Number(n) => CellValue::Number(n),
            Value::String(s) => CellValue::Text(s),
            Value::Bool(b) => CellValue::Text(b.to_string()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl From<CellValue> for Value {
    fn from(cell: CellValue) -> Self {
        match cell {
            CellValue::Null => Value::Null,
            CellValue::Number(n) => Value::Number(n),
            CellValue::Text(s) => Value::String(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n.into())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(CellValue::Number)
            .unwrap_or(CellValue::Null)
    }
}

pub type Row = BTreeMap<String, CellValue>;

/// Chart kinds the backend knows about. Only bar, line and pie are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Scatter,
    Table,
    #[serde(other)]
    Other,
}

impl ChartType {
    pub fn is_renderable(self) -> bool {
        matches!(self, ChartType::Bar | ChartType::Line | ChartType::Pie)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Scatter => "scatter",
            ChartType::Table => "table",
            ChartType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wants_visualization: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<ChartType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            wants_visualization: Some(false),
            chart_type: None,
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.question.trim().is_empty() {
            return Err(RelayError::Validation("question is required".to_string()));
        }
        Ok(())
    }
}

/// Full answer payload for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer_text: String,
    #[serde(default)]
    pub sql: String,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub row_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_suggestion: Option<ChartType>,
    #[serde(default)]
    pub execution_time: f64,
    #[serde(default)]
    pub cached: bool,
}

impl ChatResponse {
    /// An answer with no SQL and no rows, used as a safe default for renderers.
    pub fn empty(answer_text: impl Into<String>) -> Self {
        Self {
            answer_text: answer_text.into(),
            sql: String::new(),
            rows: Vec::new(),
            columns: Vec::new(),
            row_count: 0,
            chart_suggestion: None,
            execution_time: 0.0,
            cached: false,
        }
    }

    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }
}

/// Spreadsheet export formats offered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    /// `snop_data_YYYY-MM-DD.<ext>` for the given day.
    pub fn filename_for(self, date: NaiveDate) -> String {
        format!("snop_data_{}.{}", date.format("%Y-%m-%d"), self.as_str())
    }

    pub fn filename_today(self) -> String {
        self.filename_for(Utc::now().date_naive())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub sql: String,
    #[serde(default)]
    pub format: ExportFormat,
}

impl DownloadRequest {
    pub fn new(sql: impl Into<String>, format: ExportFormat) -> Self {
        Self {
            sql: sql.into(),
            format,
        }
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.sql.trim().is_empty() {
            return Err(RelayError::Validation("sql is required".to_string()));
        }
        Ok(())
    }
}

/// Uniform error body returned by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
        }
    }

    pub fn with_detail(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: Some(detail.into()),
        }
    }
}
