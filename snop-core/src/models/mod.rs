pub mod chat;
pub mod history;

pub use chat::{
    CellValue, ChartType, ChatRequest, ChatResponse, DownloadRequest, ErrorEnvelope,
    ExportFormat, Row,
};
pub use history::{HistoryRecord, HistoryResponse, Message, MessageType};
