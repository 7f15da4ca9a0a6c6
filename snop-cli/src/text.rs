//! Plain-text drawing of widget views.

use snop_core::models::{Message, MessageType};
use snop_widget::{ChartView, ResultView, TableView, ViewKind};

const BAR_WIDTH: usize = 40;

/// Header, separator and the current page, columns padded to their widest cell.
pub fn render_table(table: &TableView<'_>) -> String {
    let header: Vec<String> = table
        .header()
        .iter()
        .map(|h| match table.sort() {
            Some((col, dir)) if col == h.as_str() => format!("{} {}", h, sort_arrow(dir)),
            _ => h.clone(),
        })
        .collect();
    let rows = table.visible_rows();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str(&join_padded(&header, &widths));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &rows {
        out.push_str(&join_padded(row, &widths));
        out.push('\n');
    }

    if table.shows_pagination() {
        out.push_str(&format!(
            "{}  page {}/{}{}{}\n",
            table.page_summary(),
            table.page() + 1,
            table.page_count(),
            if table.has_previous() { "  /prev" } else { "" },
            if table.has_next() { "  /next" } else { "" },
        ));
    }
    out
}

fn sort_arrow(dir: snop_widget::SortDirection) -> &'static str {
    match dir {
        snop_widget::SortDirection::Ascending => "^",
        snop_widget::SortDirection::Descending => "v",
    }
}

fn join_padded(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

pub fn render_chart(chart: &ChartView) -> String {
    let max = chart.max_value();
    let scale = |v: f64| -> usize {
        if max <= 0.0 || v <= 0.0 {
            0
        } else {
            ((v / max) * BAR_WIDTH as f64).round() as usize
        }
    };

    let mut out = String::new();
    match chart {
        ChartView::Empty => out.push_str("(no data)\n"),
        ChartView::Bar(points) => {
            let width = label_width(points.iter().map(|p| p.label.as_str()));
            for p in points {
                out.push_str(&format!(
                    "{:<width$} | {} {}\n",
                    p.label,
                    "#".repeat(scale(p.value)),
                    snop_widget::format::format_f64(p.value),
                    width = width
                ));
            }
        }
        ChartView::Line(points) => {
            let width = label_width(points.iter().map(|p| p.label.as_str()));
            for p in points {
                out.push_str(&format!(
                    "{:<width$} | {}* {}\n",
                    p.label,
                    " ".repeat(scale(p.value)),
                    snop_widget::format::format_f64(p.value),
                    width = width
                ));
            }
        }
        ChartView::Pie(slices) => {
            let width = label_width(slices.iter().map(|s| s.label.as_str()));
            for s in slices {
                let bar = (s.percent as usize * BAR_WIDTH) / 100;
                out.push_str(&format!(
                    "{:<width$} | {} {}% [{}]\n",
                    s.label,
                    "#".repeat(bar),
                    s.percent,
                    s.color,
                    width = width
                ));
            }
        }
    }
    out
}

fn label_width<'a>(labels: impl Iterator<Item = &'a str>) -> usize {
    labels.map(|l| l.chars().count()).max().unwrap_or(0)
}

/// Answer text, SQL block, the active view and the footer.
pub fn render_answer(view: &ResultView<'_>, table: Option<&TableView<'_>>) -> String {
    let mut out = String::new();
    out.push_str(view.answer_text());
    out.push('\n');

    if let Some(sql) = view.sql() {
        out.push_str("\n```sql\n");
        out.push_str(sql.trim());
        out.push_str("\n```\n");
    }

    match view.active_view() {
        Some(ViewKind::Table) => {
            if let Some(table) = table {
                out.push('\n');
                out.push_str(&render_table(table));
            }
        }
        Some(ViewKind::Chart) => {
            if let Some(chart) = view.chart() {
                out.push('\n');
                out.push_str(&render_chart(&chart));
            }
        }
        None => {}
    }

    let views: Vec<&str> = view
        .available_views()
        .into_iter()
        .map(|v| match v {
            ViewKind::Table => "/table",
            ViewKind::Chart => "/chart",
        })
        .collect();
    if views.len() > 1 || view.export_enabled() {
        let mut hints = views;
        if view.export_enabled() {
            hints.push("/export");
        }
        out.push_str(&format!("[{}]\n", hints.join(" ")));
    }

    if view.sql().is_some() {
        out.push_str(&view.footer());
        out.push('\n');
    }
    out
}

/// One history line for `history` and the chat transcript.
pub fn render_message(message: &Message) -> String {
    let who = match message.kind {
        MessageType::User => "you",
        MessageType::Ai => "snop",
    };
    let mut out = format!(
        "[{}] {}: {}",
        message.timestamp.format("%Y-%m-%d %H:%M"),
        who,
        message.content
    );
    if let Some(sql) = message.data.as_ref().map(|d| d.sql.trim()).filter(|s| !s.is_empty()) {
        out.push_str(&format!("\n    sql: {}", sql));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use snop_core::models::{ChartType, ChatResponse, Row};

    fn answer() -> ChatResponse {
        serde_json::from_value(json!({
            "answer_text": "Category A leads.",
            "sql": "SELECT category, amount FROM fact_sales",
            "rows": [{"category": "A", "amount": 1000}, {"category": "Beta", "amount": 500}],
            "columns": ["category", "amount"],
            "row_count": 2,
            "chart_suggestion": "bar",
            "execution_time": 0.42,
            "cached": true
        }))
        .unwrap()
    }

    // ========================================================================
    // TEST 1: table is aligned and numbers are grouped
    // ========================================================================
    #[test]
    fn test_render_table_alignment() {
        let resp = answer();
        let table = TableView::new(&resp.rows, &resp.columns, resp.row_count);
        let text = render_table(&table);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "category | amount");
        assert_eq!(lines[1], "---------+-------");
        assert_eq!(lines[2], "A        | 1,000");
        assert_eq!(lines[3], "Beta     | 500");
        assert_eq!(lines.len(), 4, "no pagination line for 2 rows");
    }

    // ========================================================================
    // TEST 2: bar chart scales to the largest value
    // ========================================================================
    #[test]
    fn test_render_bar_chart() {
        let resp = answer();
        let chart = ChartView::build(&resp.rows, &resp.columns, ChartType::Bar).unwrap();
        let text = render_chart(&chart);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], format!("A    | {} 1,000", "#".repeat(40)));
        assert_eq!(lines[1], format!("Beta | {} 500", "#".repeat(20)));
    }

    // ========================================================================
    // TEST 3: pie chart shows percent and palette color
    // ========================================================================
    #[test]
    fn test_render_pie_chart() {
        let resp = answer();
        let chart = ChartView::build(&resp.rows, &resp.columns, ChartType::Pie).unwrap();
        let text = render_chart(&chart);
        assert!(text.contains("67% [#0088FE]"), "got: {}", text);
        assert!(text.contains("33% [#00C49F]"), "got: {}", text);
    }

    // ========================================================================
    // TEST 4: empty chart placeholder
    // ========================================================================
    #[test]
    fn test_render_empty_chart() {
        let rows: Vec<Row> = Vec::new();
        let chart = ChartView::build(&rows, &[], ChartType::Line).unwrap();
        assert_eq!(render_chart(&chart), "(no data)\n");
    }

    // ========================================================================
    // TEST 5: answer shows SQL block, hints and footer
    // ========================================================================
    #[test]
    fn test_render_answer_sections() {
        let resp = answer();
        let view = ResultView::new(&resp);
        let table = view.table();
        let text = render_answer(&view, table.as_ref());

        assert!(text.starts_with("Category A leads.\n"));
        assert!(text.contains("```sql\nSELECT category, amount FROM fact_sales\n```"));
        assert!(text.contains("[/table /chart /export]"));
        assert!(text.trim_end().ends_with("2 rows | 0.42s | cached"));
    }

    // ========================================================================
    // TEST 6: plain answer is just text
    // ========================================================================
    #[test]
    fn test_render_plain_answer() {
        let resp = ChatResponse::empty("Hello!");
        let view = ResultView::new(&resp);
        assert_eq!(render_answer(&view, None), "Hello!\n");
    }

    // ========================================================================
    // TEST 7: history message line includes stored SQL
    // ========================================================================
    #[test]
    fn test_render_message_with_sql() {
        let line = render_message(&Message::ai(answer()));
        assert!(line.contains("snop: Category A leads."));
        assert!(line.contains("\n    sql: SELECT category"));

        let user = render_message(&Message::user("hi"));
        assert!(user.ends_with("you: hi"));
    }
}
