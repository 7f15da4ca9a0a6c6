use std::path::PathBuf;
use std::sync::Arc;

use snop_core::models::{ChatResponse, ExportFormat};
use snop_core::SessionStore;

use crate::api::WidgetApi;
use crate::conversation::Conversation;
use crate::error::WidgetError;
use crate::export::Exporter;

/// The embeddable widget: open/maximized shell state around one conversation.
pub struct ChatWidget {
    conversation: Conversation,
    exporter: Exporter,
    open: bool,
    maximized: bool,
}

impl ChatWidget {
    /// Mount the widget. The session id is read (or created) once, here.
    pub fn new(
        api: Arc<dyn WidgetApi>,
        sessions: &dyn SessionStore,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        let session_id = sessions.get_or_create();
        tracing::debug!("Widget mounted for session {}", session_id);
        Self {
            conversation: Conversation::new(api.clone(), session_id),
            exporter: Exporter::new(api, download_dir),
            open: false,
            maximized: false,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_maximized(&self) -> bool {
        self.maximized
    }

    /// Open the widget. Only a closed-to-open transition loads history.
    pub async fn open(&mut self) {
        if self.open {
            return;
        }
        self.open = true;
        self.conversation.load_history().await;
    }

    /// Close the widget. Messages are kept.
    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn toggle_maximize(&mut self) -> bool {
        self.maximized = !self.maximized;
        self.maximized
    }

    pub async fn submit(&mut self, question: &str) -> bool {
        self.conversation.submit(question).await
    }

    pub async fn clear(&mut self) {
        self.conversation.clear().await
    }

    pub async fn export(
        &self,
        response: &ChatResponse,
        format: ExportFormat,
    ) -> Result<PathBuf, WidgetError> {
        self.exporter.export_response(response, format).await
    }
}
