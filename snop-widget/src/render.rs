//! What to show for one answer.
//!
//! [`ResultView`] decides which parts of a [`ChatResponse`] are visible and
//! which views the user may switch between. It holds the only piece of
//! per-answer UI state: the active view and the SQL block's "copied" flag.

use snop_core::models::{ChartType, ChatResponse};

use crate::chart::ChartView;
use crate::table::TableView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Table,
    Chart,
}

#[derive(Debug, Clone)]
pub struct ResultView<'a> {
    response: &'a ChatResponse,
    active: Option<ViewKind>,
    copied: bool,
}

impl<'a> ResultView<'a> {
    pub fn new(response: &'a ChatResponse) -> Self {
        let mut view = Self {
            response,
            active: None,
            copied: false,
        };
        if view.table_available() {
            view.active = Some(ViewKind::Table);
        }
        view
    }

    pub fn answer_text(&self) -> &'a str {
        &self.response.answer_text
    }

    /// The SQL block, shown only when the answer carries a query.
    pub fn sql(&self) -> Option<&'a str> {
        let sql = self.response.sql.as_str();
        (!sql.trim().is_empty()).then_some(sql)
    }

    pub fn table_available(&self) -> bool {
        self.response.has_rows()
    }

    /// The suggested chart, if it is drawable and there is data to draw.
    pub fn chart_type(&self) -> Option<ChartType> {
        self.response
            .chart_suggestion
            .filter(|c| c.is_renderable() && self.response.has_rows())
    }

    pub fn chart_available(&self) -> bool {
        self.chart_type().is_some()
    }

    pub fn available_views(&self) -> Vec<ViewKind> {
        let mut views = Vec::new();
        if self.table_available() {
            views.push(ViewKind::Table);
        }
        if self.chart_available() {
            views.push(ViewKind::Chart);
        }
        views
    }

    pub fn active_view(&self) -> Option<ViewKind> {
        self.active
    }

    /// Switch views. Returns `false` and changes nothing if `kind` is unavailable.
    pub fn select_view(&mut self, kind: ViewKind) -> bool {
        let available = match kind {
            ViewKind::Table => self.table_available(),
            ViewKind::Chart => self.chart_available(),
        };
        if available {
            self.active = Some(kind);
        }
        available
    }

    pub fn table(&self) -> Option<TableView<'a>> {
        let r = self.response;
        self.table_available()
            .then(|| TableView::new(&r.rows, &r.columns, r.row_count))
    }

    pub fn chart(&self) -> Option<ChartView> {
        let chart_type = self.chart_type()?;
        ChartView::build(&self.response.rows, &self.response.columns, chart_type)
    }

    pub fn export_enabled(&self) -> bool {
        self.response.has_rows()
    }

    /// Record a copy of the SQL block. The host clears it with [`reset_copied`]
    /// after its feedback delay.
    ///
    /// [`reset_copied`]: ResultView::reset_copied
    pub fn mark_copied(&mut self) -> Option<&'a str> {
        let sql = self.sql()?;
        self.copied = true;
        Some(sql)
    }

    pub fn copied(&self) -> bool {
        self.copied
    }

    pub fn reset_copied(&mut self) {
        self.copied = false;
    }

    /// `N rows | 0.42s`, plus `| cached` when the answer came from cache.
    pub fn footer(&self) -> String {
        let mut footer = format!(
            "{} rows | {:.2}s",
            self.response.row_count, self.response.execution_time
        );
        if self.response.cached {
            footer.push_str(" | cached");
        }
        footer
    }
}
