//! Aggregate chart data.
//!
//! The first column is always the label and the second the value, whatever
//! the chart type. Drawing is left to the host; this module only decides
//! what is drawn.

use snop_core::models::{CellValue, ChartType, Row};

/// Slice colors, assigned by index and cycled.
pub const PALETTE: [&str; 6] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#8884D8", "#82CA9D",
];

pub fn color_for(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    /// Share of the total, rounded to a whole percent.
    pub percent: u32,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartView {
    /// No rows: draw the "no data" placeholder.
    Empty,
    Bar(Vec<ChartPoint>),
    Line(Vec<ChartPoint>),
    Pie(Vec<PieSlice>),
}

impl ChartView {
    /// Build the chart for `chart_type`, or `None` when that type is not drawable.
    pub fn build(rows: &[Row], columns: &[String], chart_type: ChartType) -> Option<Self> {
        if !chart_type.is_renderable() {
            return None;
        }
        if rows.is_empty() {
            return Some(ChartView::Empty);
        }

        let points = extract_points(rows, columns);
        Some(match chart_type {
            ChartType::Line => ChartView::Line(points),
            ChartType::Pie => ChartView::Pie(pie_slices(points)),
            _ => ChartView::Bar(points),
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ChartView::Empty)
    }

    /// Largest value drawn, used to scale bars. Zero for empty charts.
    pub fn max_value(&self) -> f64 {
        let values: Box<dyn Iterator<Item = f64> + '_> = match self {
            ChartView::Empty => return 0.0,
            ChartView::Bar(points) | ChartView::Line(points) => {
                Box::new(points.iter().map(|p| p.value))
            }
            ChartView::Pie(slices) => Box::new(slices.iter().map(|s| s.value)),
        };
        values.fold(0.0, f64::max)
    }
}

fn extract_points(rows: &[Row], columns: &[String]) -> Vec<ChartPoint> {
    let label_col = columns.first();
    let value_col = columns.get(1);

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let label = label_col
                .and_then(|c| row.get(c))
                .and_then(label_text)
                .unwrap_or_else(|| format!("Item {}", i + 1));
            let value = value_col
                .and_then(|c| row.get(c))
                .and_then(CellValue::as_f64)
                .unwrap_or(0.0);
            ChartPoint { label, value }
        })
        .collect()
}

/// Null, empty and zero labels count as missing.
fn label_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Null => None,
        CellValue::Number(n) if n.as_f64() == Some(0.0) => None,
        CellValue::Number(n) => Some(n.to_string()),
        CellValue::Text(s) if s.is_empty() => None,
        CellValue::Text(s) => Some(s.clone()),
    }
}

fn pie_slices(points: Vec<ChartPoint>) -> Vec<PieSlice> {
    let total: f64 = points.iter().map(|p| p.value).sum();

    points
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let percent = if total > 0.0 {
                (p.value / total * 100.0).round().max(0.0) as u32
            } else {
                0
            };
            PieSlice {
                label: p.label,
                value: p.value,
                percent,
                color: color_for(i),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: serde_json::Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    fn cols() -> Vec<String> {
        vec!["category".to_string(), "amount".to_string()]
    }

    #[test]
    fn test_bar_uses_first_two_columns() {
        let data = rows(json!([
            {"category": "A", "amount": 100, "extra": 5},
            {"category": "B", "amount": "n/a"}
        ]));
        let chart = ChartView::build(&data, &cols(), ChartType::Bar).unwrap();
        assert_eq!(
            chart,
            ChartView::Bar(vec![
                ChartPoint { label: "A".into(), value: 100.0 },
                ChartPoint { label: "B".into(), value: 0.0 },
            ])
        );
        assert_eq!(chart.max_value(), 100.0);
    }

    #[test]
    fn test_line_keeps_row_order() {
        let data = rows(json!([
            {"category": "2025-03", "amount": 3},
            {"category": "2025-01", "amount": 1}
        ]));
        match ChartView::build(&data, &cols(), ChartType::Line).unwrap() {
            ChartView::Line(points) => {
                assert_eq!(points[0].label, "2025-03");
                assert_eq!(points[1].label, "2025-01");
            }
            other => panic!("Expected line chart, got {:?}", other),
        }
    }

    #[test]
    fn test_pie_percentages_and_palette_cycle() {
        let data: Vec<Row> = rows(json!([
            {"category": "a", "amount": 1},
            {"category": "b", "amount": 1},
            {"category": "c", "amount": 1},
            {"category": "d", "amount": 1},
            {"category": "e", "amount": 1},
            {"category": "f", "amount": 1},
            {"category": "g", "amount": 2}
        ]));
        let ChartView::Pie(slices) = ChartView::build(&data, &cols(), ChartType::Pie).unwrap()
        else {
            panic!("Expected pie chart");
        };
        assert_eq!(slices.len(), 7);
        assert_eq!(slices[0].percent, 13);
        assert_eq!(slices[6].percent, 25);
        assert_eq!(slices[0].color, "#0088FE");
        assert_eq!(slices[5].color, "#82CA9D");
        assert_eq!(slices[6].color, slices[0].color);
    }

    #[test]
    fn test_pie_zero_total() {
        let data = rows(json!([{"category": "a", "amount": 0}]));
        let ChartView::Pie(slices) = ChartView::build(&data, &cols(), ChartType::Pie).unwrap()
        else {
            panic!("Expected pie chart");
        };
        assert_eq!(slices[0].percent, 0);
    }

    #[test]
    fn test_missing_labels_fall_back_to_item_number() {
        let data = rows(json!([
            {"category": null, "amount": 1},
            {"category": "", "amount": 2},
            {"category": 2025, "amount": 3},
            {"category": 0, "amount": 4},
            {"category": 0.0, "amount": 5},
            {"category": "0", "amount": 6}
        ]));
        let ChartView::Bar(points) = ChartView::build(&data, &cols(), ChartType::Bar).unwrap()
        else {
            panic!("Expected bar chart");
        };
        let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Item 1", "Item 2", "2025", "Item 4", "Item 5", "0"]);
    }

    #[test]
    fn test_empty_and_unrenderable() {
        assert_eq!(
            ChartView::build(&[], &cols(), ChartType::Pie),
            Some(ChartView::Empty)
        );
        let data = rows(json!([{"category": "a", "amount": 1}]));
        assert!(ChartView::build(&data, &cols(), ChartType::Scatter).is_none());
        assert!(ChartView::build(&data, &cols(), ChartType::Table).is_none());
    }
}
