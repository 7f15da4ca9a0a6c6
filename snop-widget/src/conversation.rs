//! Conversation state machine.
//!
//! Holds the ordered message list for one widget lifetime and the
//! `idle`/`awaiting-response` flag. The user message of a submit is appended
//! synchronously and never rolled back; the ai message is appended when the
//! call resolves, success or failure.
//!
//! Submitting is split in two so event-driven hosts can interleave other
//! events while a question is in flight:
//!
//! ```text
//! begin_submit(question) -> Some(PendingSubmit)     idle -> awaiting
//!        ... network call ...
//! complete_submit(pending, result)                  awaiting -> idle
//! ```
//!
//! `clear()` bumps an epoch. A ticket issued before the bump is stale: its
//! response is dropped instead of landing in the cleared conversation.

use std::sync::Arc;

use chrono::Utc;
use snop_core::models::{ChatRequest, ChatResponse, HistoryResponse, Message};
use snop_core::RelayError;

use crate::api::WidgetApi;

/// Shown in place of an answer when the chat call fails.
pub const APOLOGY: &str =
    "Sorry, an error occurred while processing your question. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    AwaitingResponse,
}

/// The in-flight half of a submit, handed out by [`Conversation::begin_submit`].
#[derive(Debug)]
pub struct PendingSubmit {
    request: ChatRequest,
    epoch: u64,
}

impl PendingSubmit {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }
}

pub struct Conversation {
    api: Arc<dyn WidgetApi>,
    session_id: String,
    messages: Vec<Message>,
    state: ConversationState,
    epoch: u64,
}

impl Conversation {
    pub fn new(api: Arc<dyn WidgetApi>, session_id: impl Into<String>) -> Self {
        Self {
            api,
            session_id: session_id.into(),
            messages: Vec::new(),
            state: ConversationState::Idle,
            epoch: 0,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn is_awaiting(&self) -> bool {
        self.state == ConversationState::AwaitingResponse
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append the user message and enter `awaiting-response`.
    ///
    /// Returns `None` without touching anything when the question is blank
    /// or another submit is still unresolved.
    pub fn begin_submit(&mut self, question: &str) -> Option<PendingSubmit> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }
        if self.is_awaiting() {
            tracing::debug!("Submit ignored: a question is already in flight");
            return None;
        }

        self.messages.push(Message::user(question));
        self.state = ConversationState::AwaitingResponse;

        let request = ChatRequest::new(question).with_session(self.session_id.clone());
        Some(PendingSubmit {
            request,
            epoch: self.epoch,
        })
    }

    /// Resolve a pending submit. Returns the appended ai message, or `None`
    /// when the ticket was invalidated by a `clear()`.
    pub fn complete_submit(
        &mut self,
        pending: PendingSubmit,
        result: Result<ChatResponse, RelayError>,
    ) -> Option<&Message> {
        self.state = ConversationState::Idle;

        if pending.epoch != self.epoch {
            tracing::info!("Dropping response for a conversation that was cleared");
            return None;
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Chat request failed: {}", e);
                ChatResponse::empty(APOLOGY)
            }
        };
        self.messages.push(Message::ai(response));
        self.messages.last()
    }

    /// Submit one question and wait for its answer. Returns `false` if the
    /// submit was rejected (blank input or already awaiting).
    pub async fn submit(&mut self, question: &str) -> bool {
        let Some(pending) = self.begin_submit(question) else {
            return false;
        };
        let result = self.api.post_chat(pending.request()).await;
        self.complete_submit(pending, result);
        true
    }

    /// Replace the list with the session's stored history.
    ///
    /// Failures leave the list untouched. A result that arrives while a
    /// submit is awaiting is discarded so the pending user message survives.
    pub async fn load_history(&mut self) -> bool {
        let result = self.api.get_history(&self.session_id).await;
        self.apply_history(result)
    }

    /// Apply a history fetch result. Returns whether the list was replaced.
    pub fn apply_history(&mut self, result: Result<HistoryResponse, RelayError>) -> bool {
        let history = match result {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!("Failed to load chat history: {}", e);
                return false;
            }
        };

        if self.is_awaiting() {
            tracing::warn!("Discarding chat history loaded while a question is in flight");
            return false;
        }

        let loaded_at = Utc::now();
        self.messages = history
            .messages
            .into_iter()
            .map(|record| Message::from_history(record, loaded_at))
            .collect();
        tracing::debug!("Loaded {} history messages", self.messages.len());
        true
    }

    /// Delete the stored history, then empty the list whatever the outcome.
    pub async fn clear(&mut self) {
        if let Err(e) = self.api.delete_history(&self.session_id).await {
            tracing::warn!("Failed to delete chat history: {}", e);
        }
        self.reset();
    }

    /// Local half of `clear()`: empty the list and invalidate any pending ticket.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.epoch += 1;
    }
}
