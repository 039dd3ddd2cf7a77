//! SVG Chart Generator for Training History
//!
//! Renders line charts side by side into a single SVG file, used to plot
//! accuracy and loss per epoch after training.

use std::fs;
use std::path::Path;

/// Chart styling constants
const PANEL_WIDTH: f64 = 600.0;
const PANEL_HEIGHT: f64 = 400.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 70.0;
const MARGIN_LEFT: f64 = 80.0;

pub const COLOR_PRIMARY: &str = "#3498db";
pub const COLOR_SECONDARY: &str = "#e67e22";
const COLOR_GRID: &str = "#ecf0f1";
const COLOR_AXIS: &str = "#2c3e50";
const COLOR_TEXT: &str = "#2c3e50";

/// A data point for a line chart
#[derive(Debug, Clone)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
}

/// A named series drawn as one line
#[derive(Debug, Clone)]
pub struct DataSeries {
    pub name: String,
    pub points: Vec<DataPoint>,
    pub color: String,
}

impl DataSeries {
    /// Build a series from per-epoch values, x starting at epoch 1
    pub fn from_epochs(name: &str, values: &[f64], color: &str) -> Self {
        Self {
            name: name.to_string(),
            points: values
                .iter()
                .enumerate()
                .map(|(i, &y)| DataPoint {
                    x: (i + 1) as f64,
                    y,
                })
                .collect(),
            color: color.to_string(),
        }
    }
}

/// One chart panel: title, axis labels and the series it plots
#[derive(Debug, Clone)]
pub struct ChartPanel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<DataSeries>,
}

/// Write panels left to right into one SVG file
pub fn generate_panels(panels: &[ChartPanel], output_path: &Path) -> std::io::Result<()> {
    let total_width = PANEL_WIDTH * panels.len().max(1) as f64;

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">"#,
        total_width, PANEL_HEIGHT, total_width, PANEL_HEIGHT
    ));
    svg.push_str(&format!(
        r#"<rect width="{}" height="{}" fill="white"/>"#,
        total_width, PANEL_HEIGHT
    ));

    for (i, panel) in panels.iter().enumerate() {
        svg.push_str(&format!(
            r#"<g transform="translate({} 0)">"#,
            i as f64 * PANEL_WIDTH
        ));
        svg.push_str(&render_panel(panel));
        svg.push_str("</g>");
    }

    svg.push_str("</svg>");

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output_path, svg)
}

fn render_panel(panel: &ChartPanel) -> String {
    let plot_width = PANEL_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = PANEL_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let (x_min, x_max, y_min, y_max) = find_ranges(&panel.series);
    let x_span = if x_max > x_min { x_max - x_min } else { 1.0 };
    let y_span = if y_max > y_min { y_max - y_min } else { 1.0 };

    let to_x = |x: f64| MARGIN_LEFT + ((x - x_min) / x_span) * plot_width;
    let to_y = |y: f64| MARGIN_TOP + plot_height - ((y - y_min) / y_span) * plot_height;

    let mut svg = String::new();

    svg.push_str(&format!(
        r#"<text x="{}" y="35" text-anchor="middle" font-family="Arial, sans-serif" font-size="16" font-weight="bold" fill="{}">{}</text>"#,
        PANEL_WIDTH / 2.0, COLOR_TEXT, escape_xml(&panel.title)
    ));

    // Grid lines with y tick labels
    for i in 0..=5 {
        let value = y_min + (i as f64 / 5.0) * y_span;
        let y = to_y(value);
        svg.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1"/>"#,
            MARGIN_LEFT, y, MARGIN_LEFT + plot_width, y, COLOR_GRID
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="12" fill="{}">{:.2}</text>"#,
            MARGIN_LEFT - 10.0, y + 4.0, COLOR_TEXT, value
        ));
    }

    // Axes
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT, MARGIN_TOP + plot_height, MARGIN_LEFT + plot_width, MARGIN_TOP + plot_height, COLOR_AXIS
    ));
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT, MARGIN_TOP, MARGIN_LEFT, MARGIN_TOP + plot_height, COLOR_AXIS
    ));

    // Axis labels
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="13" fill="{}">{}</text>"#,
        MARGIN_LEFT + plot_width / 2.0, PANEL_HEIGHT - 20.0, COLOR_TEXT, escape_xml(&panel.x_label)
    ));
    svg.push_str(&format!(
        r#"<text x="20" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="13" fill="{}" transform="rotate(-90 20 {})">{}</text>"#,
        PANEL_HEIGHT / 2.0, COLOR_TEXT, PANEL_HEIGHT / 2.0, escape_xml(&panel.y_label)
    ));

    for series in &panel.series {
        if series.points.is_empty() {
            continue;
        }

        let mut path = String::new();
        for (i, point) in series.points.iter().enumerate() {
            let cmd = if i == 0 { "M" } else { " L" };
            path.push_str(&format!("{} {} {}", cmd, to_x(point.x), to_y(point.y)));
        }
        svg.push_str(&format!(
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
            path, series.color
        ));

        for point in &series.points {
            svg.push_str(&format!(
                r#"<circle cx="{}" cy="{}" r="3" fill="{}"/>"#,
                to_x(point.x),
                to_y(point.y),
                series.color
            ));
        }
    }

    // X tick labels from the first series
    if let Some(series) = panel.series.first() {
        for point in &series.points {
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="11" fill="{}">{:.0}</text>"#,
                to_x(point.x), MARGIN_TOP + plot_height + 20.0, COLOR_TEXT, point.x
            ));
        }
    }

    // Legend
    let mut legend_y = MARGIN_TOP + 10.0;
    for series in &panel.series {
        svg.push_str(&format!(
            r#"<rect x="{}" y="{}" width="12" height="12" fill="{}"/>"#,
            PANEL_WIDTH - MARGIN_RIGHT - 170.0, legend_y, series.color
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            PANEL_WIDTH - MARGIN_RIGHT - 152.0, legend_y + 10.0, COLOR_TEXT, escape_xml(&series.name)
        ));
        legend_y += 20.0;
    }

    svg
}

fn find_ranges(series: &[DataSeries]) -> (f64, f64, f64, f64) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for s in series {
        for p in &s.points {
            x_min = x_min.min(p.x);
            x_max = x_max.max(p.x);
            y_min = y_min.min(p.y);
            y_max = y_max.max(p.y);
        }
    }

    if !x_min.is_finite() {
        return (0.0, 1.0, 0.0, 1.0);
    }

    // Anchor at zero so loss and accuracy curves keep their scale
    (x_min, x_max, y_min.min(0.0), y_max)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panels_written_side_by_side() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.svg");

        let panels = vec![
            ChartPanel {
                title: "Model accuracy".to_string(),
                x_label: "Epoch".to_string(),
                y_label: "Accuracy".to_string(),
                series: vec![
                    DataSeries::from_epochs("train", &[0.5, 0.6, 0.7], COLOR_PRIMARY),
                    DataSeries::from_epochs("validation", &[0.45, 0.55, 0.65], COLOR_SECONDARY),
                ],
            },
            ChartPanel {
                title: "Model loss".to_string(),
                x_label: "Epoch".to_string(),
                y_label: "Loss".to_string(),
                series: vec![DataSeries::from_epochs("train", &[0.69, 0.6, 0.5], COLOR_PRIMARY)],
            },
        ];

        generate_panels(&panels, &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Model accuracy"));
        assert!(svg.contains("Model loss"));
        assert!(svg.contains(r#"translate(600 0)"#));
    }

    #[test]
    fn test_empty_series_has_sane_ranges() {
        assert_eq!(find_ranges(&[]), (0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&"), "a&lt;b&gt;&amp;");
    }

    #[test]
    fn test_from_epochs_is_one_based() {
        let series = DataSeries::from_epochs("loss", &[1.0, 0.5], COLOR_PRIMARY);
        assert_eq!(series.points[0].x, 1.0);
        assert_eq!(series.points[1].x, 2.0);
    }
}
