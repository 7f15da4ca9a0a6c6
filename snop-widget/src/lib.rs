//! Chat widget logic, independent of any particular front end.
//!
//! A host (terminal, web view, test) owns one [`ChatWidget`], feeds it user
//! events, and draws whatever [`ResultView`], [`TableView`] and [`ChartView`]
//! describe. All network access goes through a [`WidgetApi`] implementation,
//! normally [`RelayApi`] pointed at the relay.

pub mod api;
pub mod chart;
pub mod conversation;
pub mod error;
pub mod export;
pub mod format;
pub mod render;
pub mod table;
pub mod widget;

pub use api::{RelayApi, WidgetApi};
pub use chart::{ChartPoint, ChartView, PieSlice, PALETTE};
pub use conversation::{Conversation, ConversationState, PendingSubmit, APOLOGY};
pub use error::WidgetError;
pub use export::Exporter;
pub use render::{ResultView, ViewKind};
pub use table::{SortDirection, TableView, PAGE_SIZE};
pub use widget::ChatWidget;

#[cfg(test)]
pub(crate) mod testing;
