//! Text line charts.
//!
//! The chart is drawn with ratatui into an off-screen buffer which is then
//! dumped line by line, so it can be printed like any other output.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::symbols::Marker;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Widget};

/// Scales `values` so the largest becomes `top`; all-zero input stays zero.
pub fn scale_to(values: &[u64], top: f64) -> Vec<f64> {
    let max = values.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|v| *v as f64 / max as f64 * top)
        .collect()
}

/// Renders `values` as a line chart of `width` x `height` cells.
///
/// `first_label` and `last_label` annotate the ends of the x axis.
pub fn render_trend(
    values: &[f64],
    first_label: &str,
    last_label: &str,
    width: u16,
    height: u16,
) -> String {
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64, *v))
        .collect();
    let x_max = points.len().saturating_sub(1).max(1) as f64;
    let y_max = values.iter().copied().fold(0.0_f64, f64::max).max(1.0);

    let dataset = Dataset::default()
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .x_axis(Axis::default().bounds([0.0, x_max]).labels(vec![
            Span::raw(first_label.to_string()),
            Span::raw(last_label.to_string()),
        ]))
        .y_axis(Axis::default().bounds([0.0, y_max]).labels(vec![
            Span::raw("0"),
            Span::raw(format!("{y_max:.0}")),
        ]));

    let area = Rect::new(0, 0, width, height);
    let mut buffer = Buffer::empty(area);
    chart.render(area, &mut buffer);

    buffer_to_string(&buffer)
}

/// Dumps a buffer as text, dropping trailing blanks and empty bottom lines.
fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut lines: Vec<String> = (0..area.height)
        .map(|y| {
            (0..area.width)
                .filter_map(|x| buffer.cell((x, y)).map(|c| c.symbol()))
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect();

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
