// ============================================================
// REPORT LAYOUT
// ============================================================
// Flows report blocks onto fixed-size pages as positioned draw ops.
// Coordinates are PDF user space: origin bottom-left, y grows upwards.

use std::f32::consts::PI;

use chrono::{DateTime, Utc};

use crate::domain::equipment::{
    Dataset, EquipmentRecord, NumericField, COL_EQUIPMENT_NAME, COL_TYPE,
};
use crate::domain::report_style::{ReportStyle, Rgb};

pub const REPORT_TITLE: &str = "Chemical Equipment Analysis Report";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Approximate Helvetica advance width, as a fraction of the font size
const AVG_GLYPH_WIDTH: f32 = 0.52;
const ROW_HEIGHT_FACTOR: f32 = 2.2;
const CELL_PADDING: f32 = 4.0;
const SECTION_GAP: f32 = 24.0;
const PIE_DIAMETER: f32 = 180.0;
const PIE_SEGMENTS: usize = 96;
const LEGEND_MAX_ENTRIES: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: Font,
        color: Rgb,
        text: String,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    },
    Polygon {
        points: Vec<(f32, f32)>,
        fill: Rgb,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<Page>,
}

impl ReportLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every text run in reading order, across all pages
    pub fn texts(&self) -> Vec<&str> {
        self.pages.iter().flat_map(|p| p.texts()).collect()
    }
}

/// A table block. `widths` are fractions of the content width.
struct Table {
    header: Option<Vec<String>>,
    widths: Vec<f32>,
    rows: Vec<Vec<String>>,
    font_size: f32,
    /// Shade the first column like a label (key/value tables)
    label_column: bool,
}

pub fn compose(
    style: &ReportStyle,
    dataset: &Dataset,
    sample: &[EquipmentRecord],
    sample_cap: usize,
    generated_at: DateTime<Utc>,
) -> ReportLayout {
    let mut composer = Composer::new(style);

    composer.title_block(&dataset.filename);
    composer.table(&metadata_table(style, dataset, generated_at));
    composer.gap(SECTION_GAP);

    composer.heading("Summary Statistics");
    composer.table(&stats_table(style, dataset));
    composer.gap(SECTION_GAP);

    composer.heading("Equipment Type Distribution");
    let slices: Vec<(String, i64, Rgb)> = dataset
        .distribution_by_count()
        .into_iter()
        .enumerate()
        .map(|(i, (name, count))| (name.to_string(), count, style.slice_color(i)))
        .collect();
    composer.pie_chart(&slices);
    composer.table(&distribution_table(style, dataset));
    composer.gap(SECTION_GAP);

    composer.heading("Equipment Details (Sample)");
    composer.table(&sample_table(style, dataset, sample, sample_cap));

    composer.finish()
}

fn metadata_table(style: &ReportStyle, dataset: &Dataset, generated_at: DateTime<Utc>) -> Table {
    let rows = vec![
        ("Report Generated:", generated_at.format(TIMESTAMP_FORMAT).to_string()),
        ("Dataset File:", dataset.filename.clone()),
        ("Upload Date:", dataset.created_at.format(TIMESTAMP_FORMAT).to_string()),
        ("Total Equipment Count:", dataset.record_count.to_string()),
        ("User:", dataset.owner.clone()),
    ];

    Table {
        header: None,
        widths: vec![0.4, 0.6],
        rows: rows
            .into_iter()
            .map(|(label, value)| vec![label.to_string(), value])
            .collect(),
        font_size: style.body_font_size,
        label_column: true,
    }
}

fn stats_table(style: &ReportStyle, dataset: &Dataset) -> Table {
    let rows = NumericField::ALL
        .iter()
        .map(|&field| {
            let stats = dataset.field_stats.get(field);
            vec![
                field.column().to_string(),
                format!("{:.2}", dataset.average(field)),
                format!("{:.2}", stats.min),
                format!("{:.2}", stats.max),
                stats
                    .std_dev
                    .map(|s| format!("{:.2}", s))
                    .unwrap_or_else(|| "n/a".to_string()),
                field.unit().to_string(),
            ]
        })
        .collect();

    Table {
        header: Some(
            ["Parameter", "Mean", "Min", "Max", "Std Dev", "Unit"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        ),
        widths: vec![0.24, 0.16, 0.16, 0.16, 0.16, 0.12],
        rows,
        font_size: style.body_font_size,
        label_column: false,
    }
}

fn distribution_table(style: &ReportStyle, dataset: &Dataset) -> Table {
    let rows = dataset
        .distribution_by_count()
        .into_iter()
        .map(|(name, count)| {
            vec![
                name.to_string(),
                count.to_string(),
                format!("{:.1}%", dataset.percentage(count)),
            ]
        })
        .collect();

    Table {
        header: Some(vec![
            "Equipment Type".to_string(),
            "Count".to_string(),
            "Percentage".to_string(),
        ]),
        widths: vec![0.4, 0.2, 0.2],
        rows,
        font_size: style.body_font_size,
        label_column: false,
    }
}

fn sample_table(
    style: &ReportStyle,
    dataset: &Dataset,
    sample: &[EquipmentRecord],
    sample_cap: usize,
) -> Table {
    let shown: Vec<&EquipmentRecord> = sample.iter().take(sample_cap).collect();

    let mut rows: Vec<Vec<String>> = shown
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                r.equipment_type.clone(),
                format!("{:.1}", r.flowrate),
                format!("{:.1}", r.pressure),
                format!("{:.1}", r.temperature),
            ]
        })
        .collect();

    if dataset.record_count > shown.len() as i64 {
        rows.push(vec!["...".to_string(); 5]);
        let mut footer = vec![String::new(); 5];
        footer[0] = format!("{} total records", dataset.record_count);
        rows.push(footer);
    }

    let mut header = vec![COL_EQUIPMENT_NAME.to_string(), COL_TYPE.to_string()];
    header.extend(NumericField::ALL.iter().map(|f| f.column().to_string()));

    Table {
        header: Some(header),
        widths: vec![0.3, 0.22, 0.16, 0.16, 0.16],
        rows,
        font_size: style.sample_font_size,
        label_column: false,
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_GLYPH_WIDTH
}

/// Truncate `text` with a trailing ellipsis so it fits `max_width`
fn fit_text(text: &str, max_width: f32, size: f32) -> String {
    if text_width(text, size) <= max_width {
        return text.to_string();
    }
    let budget = ((max_width / (size * AVG_GLYPH_WIDTH)) as usize).saturating_sub(3);
    let mut fitted: String = text.chars().take(budget).collect();
    fitted.push_str("...");
    fitted
}

struct Composer<'a> {
    style: &'a ReportStyle,
    pages: Vec<Page>,
    page: Page,
    /// Top of the free area on the current page
    cursor: f32,
}

impl<'a> Composer<'a> {
    fn new(style: &'a ReportStyle) -> Self {
        Self {
            style,
            pages: Vec::new(),
            page: Page::default(),
            cursor: style.page_height - style.margin,
        }
    }

    fn top(&self) -> f32 {
        self.style.page_height - self.style.margin
    }

    fn break_page(&mut self) {
        let page = std::mem::take(&mut self.page);
        self.pages.push(page);
        self.cursor = self.top();
    }

    /// Start a new page unless `height` still fits. A fresh page never breaks
    /// again, so an oversized block overflows instead of looping.
    fn reserve(&mut self, height: f32) {
        if self.cursor - height < self.style.margin && self.cursor < self.top() {
            self.break_page();
        }
    }

    fn gap(&mut self, height: f32) {
        self.cursor -= height;
    }

    fn push(&mut self, op: DrawOp) {
        self.page.ops.push(op);
    }

    fn centered_line(&mut self, text: &str, size: f32, font: Font, color: Rgb) {
        let line_height = size * 1.4;
        self.reserve(line_height);
        self.cursor -= line_height;
        let content_width = self.style.content_width();
        let text = fit_text(text, content_width, size);
        let x = self.style.margin + (content_width - text_width(&text, size)).max(0.0) / 2.0;
        self.push(DrawOp::Text {
            x,
            y: self.cursor + size * 0.3,
            size,
            font,
            color,
            text,
        });
    }

    fn title_block(&mut self, filename: &str) {
        let style = self.style;
        self.centered_line(REPORT_TITLE, style.title_font_size, Font::Bold, style.title_color);
        self.centered_line(filename, style.title_font_size, Font::Bold, style.title_color);
        self.gap(SECTION_GAP);
    }

    fn heading(&mut self, text: &str) {
        let size = self.style.heading_font_size;
        let line_height = size * 1.6;
        // Keep a heading together with the first lines of its block
        self.reserve(line_height + self.style.body_font_size * ROW_HEIGHT_FACTOR * 2.0);
        self.cursor -= line_height;
        self.push(DrawOp::Text {
            x: self.style.margin,
            y: self.cursor + size * 0.4,
            size,
            font: Font::Bold,
            color: self.style.heading_color,
            text: text.to_string(),
        });
    }

    fn table(&mut self, table: &Table) {
        let row_height = table.font_size * ROW_HEIGHT_FACTOR;
        let content_width = self.style.content_width();
        let widths: Vec<f32> = table.widths.iter().map(|w| w * content_width).collect();
        let table_width: f32 = widths.iter().sum();
        let left = self.style.margin + (content_width - table_width).max(0.0) / 2.0;

        let leading_rows = if table.header.is_some() { 2.0 } else { 1.0 };
        self.reserve(row_height * leading_rows);
        if let Some(header) = &table.header {
            self.header_row(header, &widths, left, row_height, table.font_size);
        }

        for row in &table.rows {
            if self.cursor - row_height < self.style.margin {
                self.break_page();
                if let Some(header) = &table.header {
                    self.header_row(header, &widths, left, row_height, table.font_size);
                }
            }
            self.body_row(row, &widths, left, row_height, table);
        }
    }

    fn header_row(&mut self, cells: &[String], widths: &[f32], left: f32, height: f32, size: f32) {
        let style = self.style;
        self.row(cells, widths, left, height, size, |_| {
            (style.header_fill, style.header_text, Font::Bold)
        });
    }

    fn body_row(&mut self, cells: &[String], widths: &[f32], left: f32, height: f32, table: &Table) {
        let style = self.style;
        let label_column = table.label_column;
        self.row(cells, widths, left, height, table.font_size, |col| {
            if label_column && col == 0 {
                (style.label_fill, style.text_color, Font::Regular)
            } else {
                (style.body_fill, style.text_color, Font::Regular)
            }
        });
    }

    fn row<F>(&mut self, cells: &[String], widths: &[f32], left: f32, height: f32, size: f32, look: F)
    where
        F: Fn(usize) -> (Rgb, Rgb, Font),
    {
        let y = self.cursor - height;
        let mut x = left;
        for (col, (cell, width)) in cells.iter().zip(widths).enumerate() {
            let (fill, color, font) = look(col);
            self.push(DrawOp::Rect {
                x,
                y,
                width: *width,
                height,
                fill: Some(fill),
                stroke: Some(self.style.grid_color),
            });
            if !cell.is_empty() {
                self.push(DrawOp::Text {
                    x: x + CELL_PADDING,
                    y: y + (height - size * 0.7) / 2.0,
                    size,
                    font,
                    color,
                    text: fit_text(cell, width - 2.0 * CELL_PADDING, size),
                });
            }
            x += width;
        }
        self.cursor = y;
    }

    /// Pie with a legend to its right. Slices run clockwise from 12 o'clock.
    fn pie_chart(&mut self, slices: &[(String, i64, Rgb)]) {
        let style = self.style;
        let legend_line = style.body_font_size * 1.6;
        let legend_rows = slices.len().min(LEGEND_MAX_ENTRIES) + usize::from(slices.len() > LEGEND_MAX_ENTRIES);
        let block_height = PIE_DIAMETER.max(legend_rows as f32 * legend_line) + 20.0;
        self.reserve(block_height);

        let top = self.cursor - 10.0;
        let radius = PIE_DIAMETER / 2.0;
        let (cx, cy) = (style.margin + 20.0 + radius, top - radius);

        let total: i64 = slices.iter().map(|(_, count, _)| count).sum();
        if total > 0 {
            let mut start = PI / 2.0;
            for (_, count, color) in slices {
                let sweep = *count as f32 / total as f32 * 2.0 * PI;
                let steps = ((sweep / (2.0 * PI)) * PIE_SEGMENTS as f32).ceil().max(2.0) as usize;
                let mut points = vec![(cx, cy)];
                for step in 0..=steps {
                    let angle = start - sweep * step as f32 / steps as f32;
                    points.push((cx + radius * angle.cos(), cy + radius * angle.sin()));
                }
                self.push(DrawOp::Polygon {
                    points,
                    fill: *color,
                });
                start -= sweep;
            }
        }

        let legend_x = cx + radius + 30.0;
        let swatch = style.body_font_size;
        let mut y = top - legend_line;
        for (name, count, color) in slices.iter().take(LEGEND_MAX_ENTRIES) {
            self.push(DrawOp::Rect {
                x: legend_x,
                y,
                width: swatch,
                height: swatch,
                fill: Some(*color),
                stroke: None,
            });
            self.push(DrawOp::Text {
                x: legend_x + swatch + 6.0,
                y: y + 1.0,
                size: style.body_font_size,
                font: Font::Regular,
                color: style.text_color,
                text: format!("{} ({})", name, count),
            });
            y -= legend_line;
        }
        if slices.len() > LEGEND_MAX_ENTRIES {
            self.push(DrawOp::Text {
                x: legend_x,
                y: y + 1.0,
                size: style.body_font_size,
                font: Font::Regular,
                color: style.text_color,
                text: format!("+{} more", slices.len() - LEGEND_MAX_ENTRIES),
            });
        }

        self.cursor -= block_height;
    }

    fn finish(mut self) -> ReportLayout {
        if !self.page.ops.is_empty() || self.pages.is_empty() {
            let page = std::mem::take(&mut self.page);
            self.pages.push(page);
        }
        ReportLayout { pages: self.pages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::equipment::{FieldStatistics, FieldStats};
    use chrono::TimeZone;

    fn dataset(record_count: i64, distribution: &[(&str, i64)]) -> Dataset {
        let stats = FieldStats {
            mean: 22.6,
            min: 0.0,
            max: 45.2,
            std_dev: Some(31.96),
        };
        Dataset {
            id: 3,
            owner: "alice".into(),
            filename: "plant.csv".into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
            record_count,
            avg_flowrate: 22.6,
            avg_pressure: 13.85,
            avg_temperature: 296.575,
            type_distribution: distribution.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            field_stats: FieldStatistics {
                flowrate: stats,
                pressure: FieldStats { std_dev: None, ..stats },
                temperature: stats,
            },
            dropped_rows: 0,
        }
    }

    fn records(n: usize) -> Vec<EquipmentRecord> {
        (0..n)
            .map(|i| EquipmentRecord {
                name: format!("Pump-{}", i + 1),
                equipment_type: "Pump".into(),
                flowrate: 10.0 + i as f64,
                pressure: 5.0,
                temperature: 300.0,
            })
            .collect()
    }

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_sections_in_order() {
        let ds = dataset(2, &[("Pump", 1), ("Valve", 1)]);
        let layout = compose(&ReportStyle::default(), &ds, &records(2), 20, generated_at());
        let texts = layout.texts();

        let position = |needle: &str| {
            texts
                .iter()
                .position(|t| *t == needle)
                .unwrap_or_else(|| panic!("missing {needle}"))
        };
        assert_eq!(position(REPORT_TITLE), 0);
        assert!(position("Report Generated:") < position("Summary Statistics"));
        assert!(position("Summary Statistics") < position("Equipment Type Distribution"));
        assert!(position("Equipment Type Distribution") < position("Equipment Details (Sample)"));
        assert!(texts.contains(&"2024-05-02 09:00:00"));
        assert!(texts.contains(&"2024-05-01 08:30:00"));
        assert!(texts.contains(&"alice"));
    }

    #[test]
    fn test_stats_table_units_and_missing_std_dev() {
        let ds = dataset(2, &[("Pump", 2)]);
        let layout = compose(&ReportStyle::default(), &ds, &records(2), 20, generated_at());
        let texts = layout.texts();

        for unit in ["L/min", "bar", "K"] {
            assert!(texts.contains(&unit), "missing unit {unit}");
        }
        assert!(texts.contains(&"22.60"));
        assert!(texts.contains(&"n/a"));
    }

    #[test]
    fn test_distribution_percentages() {
        let ds = dataset(3, &[("Valve", 1), ("Pump", 2)]);
        let layout = compose(&ReportStyle::default(), &ds, &records(3), 20, generated_at());
        let texts = layout.texts();

        assert!(texts.contains(&"66.7%"));
        assert!(texts.contains(&"33.3%"));
        assert!(texts.contains(&"Pump (2)"));
    }

    #[test]
    fn test_distribution_tie_rounds_half_even() {
        let ds = dataset(16, &[("A", 1), ("B", 15)]);
        let layout = compose(&ReportStyle::default(), &ds, &records(16), 20, generated_at());
        let texts = layout.texts();

        assert!(texts.contains(&"6.2%"));
        assert!(texts.contains(&"93.8%"));
    }

    #[test]
    fn test_long_filename_stays_inside_margins() {
        let style = ReportStyle::default();
        let mut ds = dataset(2, &[("Pump", 2)]);
        ds.filename = format!("{}.csv", "plant_measurements_".repeat(12));
        let layout = compose(&style, &ds, &records(2), 20, generated_at());

        let right_edge = style.page_width - style.margin;
        for op in &layout.pages[0].ops {
            if let DrawOp::Text { x, size, text, .. } = op {
                assert!(*x >= style.margin - 0.01, "{text} starts left of the margin");
                assert!(
                    x + text_width(text, *size) <= right_edge + 0.01,
                    "{text} runs past the right margin"
                );
            }
        }
        assert!(layout.texts()[1].ends_with("..."));
    }

    #[test]
    fn test_sample_capped_with_ellipsis_and_total() {
        let ds = dataset(25, &[("Pump", 25)]);
        let layout = compose(&ReportStyle::default(), &ds, &records(25), 20, generated_at());
        let texts = layout.texts();

        let sample_names = texts.iter().filter(|t| t.starts_with("Pump-")).count();
        assert_eq!(sample_names, 20);
        assert!(!texts.contains(&"Pump-21"));
        assert_eq!(texts.iter().filter(|t| **t == "...").count(), 5);
        assert!(texts.contains(&"25 total records"));
    }

    #[test]
    fn test_small_sample_has_no_footer() {
        let ds = dataset(2, &[("Pump", 2)]);
        let layout = compose(&ReportStyle::default(), &ds, &records(2), 20, generated_at());
        assert!(!layout.texts().contains(&"..."));
    }

    #[test]
    fn test_long_tables_break_pages_and_repeat_header() {
        let distribution: Vec<(String, i64)> = (0..60).map(|i| (format!("Type-{i:02}"), 1)).collect();
        let refs: Vec<(&str, i64)> = distribution.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        let ds = dataset(60, &refs);

        let layout = compose(&ReportStyle::default(), &ds, &records(20), 20, generated_at());
        assert!(layout.page_count() > 1);

        let header_count = layout.texts().iter().filter(|t| **t == "Equipment Type").count();
        assert!(header_count >= 2);

        let style = ReportStyle::default();
        for page in &layout.pages {
            for op in &page.ops {
                if let DrawOp::Rect { y, .. } = op {
                    assert!(*y >= style.margin - 0.01);
                }
            }
        }
    }

    #[test]
    fn test_fit_text_truncates() {
        assert_eq!(fit_text("Pump", 100.0, 10.0), "Pump");
        let fitted = fit_text(&"x".repeat(100), 50.0, 10.0);
        assert!(fitted.ends_with("..."));
        assert!(fitted.chars().count() < 100);
    }
}
