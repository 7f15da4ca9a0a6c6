//! Sortable, paginated grid over the delivered rows.
//!
//! Sorting and paging never go back to the backend: they only reorder and
//! slice what the answer carried inline.

use std::cmp::Ordering;

use snop_core::models::{CellValue, Row};

use crate::format::format_cell;

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn opposite(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SortState {
    column: String,
    direction: SortDirection,
}

#[derive(Debug, Clone)]
pub struct TableView<'a> {
    rows: &'a [Row],
    columns: &'a [String],
    row_count: usize,
    sort: Option<SortState>,
    order: Vec<usize>,
    page: usize,
}

impl<'a> TableView<'a> {
    pub fn new(rows: &'a [Row], columns: &'a [String], row_count: usize) -> Self {
        Self {
            rows,
            columns,
            row_count,
            sort: None,
            order: (0..rows.len()).collect(),
            page: 0,
        }
    }

    /// One header cell per column, in the answer's column order.
    pub fn header(&self) -> &[String] {
        self.columns
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn sort(&self) -> Option<(&str, SortDirection)> {
        self.sort
            .as_ref()
            .map(|s| (s.column.as_str(), s.direction))
    }

    /// Cycle the sort on `column`: none → first direction → opposite → none.
    /// A column whose first delivered cell is text starts ascending, any other
    /// column starts descending. Unknown columns are ignored.
    pub fn toggle_sort(&mut self, column: &str) {
        if !self.columns.iter().any(|c| c == column) {
            return;
        }

        let first = self.first_direction(column);
        self.sort = match self.sort.take() {
            Some(s) if s.column == column => {
                if s.direction == first {
                    Some(SortState {
                        column: s.column,
                        direction: first.opposite(),
                    })
                } else {
                    None
                }
            }
            _ => Some(SortState {
                column: column.to_string(),
                direction: first,
            }),
        };
        self.reorder();
        self.page = 0;
    }

    fn first_direction(&self, column: &str) -> SortDirection {
        match self.rows.first().and_then(|row| row.get(column)) {
            Some(CellValue::Text(_)) => SortDirection::Ascending,
            _ => SortDirection::Descending,
        }
    }

    fn reorder(&mut self) {
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        if let Some(sort) = &self.sort {
            let rows = self.rows;
            order.sort_by(|&a, &b| {
                let ord = compare_cells(rows[a].get(&sort.column), rows[b].get(&sort.column));
                match sort.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }
        self.order = order;
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(PAGE_SIZE).max(1)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.page_count()
    }

    pub fn next_page(&mut self) -> bool {
        if self.has_next() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn previous_page(&mut self) -> bool {
        if self.has_previous() {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Pagination controls are only drawn when the result is larger than a page.
    pub fn shows_pagination(&self) -> bool {
        self.row_count > PAGE_SIZE
    }

    /// Formatted cells of the current page, one inner vec per row.
    pub fn visible_rows(&self) -> Vec<Vec<String>> {
        let start = self.page * PAGE_SIZE;
        self.order
            .iter()
            .skip(start)
            .take(PAGE_SIZE)
            .map(|&i| {
                let row = &self.rows[i];
                self.columns
                    .iter()
                    .map(|c| row.get(c).map(format_cell).unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    /// `start-end of total` for the current page, 1-based.
    pub fn page_summary(&self) -> String {
        let total = self.rows.len();
        if total == 0 {
            return "0 of 0".to_string();
        }
        let start = self.page * PAGE_SIZE + 1;
        let end = (start + PAGE_SIZE - 1).min(total);
        format!("{}-{} of {}", start, end, total)
    }
}

/// Nulls (and missing cells) first, then numbers by value, then text.
fn compare_cells(a: Option<&CellValue>, b: Option<&CellValue>) -> Ordering {
    fn rank(cell: Option<&CellValue>) -> u8 {
        match cell {
            None | Some(CellValue::Null) => 0,
            Some(CellValue::Number(_)) => 1,
            Some(CellValue::Text(_)) => 2,
        }
    }

    match (a, b) {
        (Some(CellValue::Number(x)), Some(CellValue::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.total_cmp(&y)
        }
        (Some(CellValue::Text(x)), Some(CellValue::Text(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
