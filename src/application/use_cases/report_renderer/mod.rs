//! Report Renderer
//!
//! Turns a stored dataset and a bounded sample of its records into a PDF.
//! Rendering is split in two steps: `layout` places every block on A4 pages
//! as draw ops, then `pdf` encodes those ops. The only input that is not part
//! of the dataset is the caller-supplied `generated_at` timestamp, so equal
//! inputs always produce equal bytes.

mod layout;
mod pdf;

pub use layout::{DrawOp, Font, Page, ReportLayout, REPORT_TITLE, TIMESTAMP_FORMAT};

use chrono::{DateTime, Utc};

use crate::domain::equipment::{Dataset, EquipmentRecord};
use crate::domain::error::Result;
use crate::domain::report_style::ReportStyle;

pub const DEFAULT_SAMPLE_ROWS: usize = 20;

#[derive(Debug, Clone)]
pub struct ReportRenderer {
    style: ReportStyle,
    sample_cap: usize,
}

impl ReportRenderer {
    pub fn new(style: ReportStyle) -> Self {
        Self {
            style,
            sample_cap: DEFAULT_SAMPLE_ROWS,
        }
    }

    pub fn with_sample_cap(mut self, sample_cap: usize) -> Self {
        self.sample_cap = sample_cap;
        self
    }

    /// Number of records the sample table shows
    pub fn sample_cap(&self) -> usize {
        self.sample_cap
    }

    pub fn style(&self) -> &ReportStyle {
        &self.style
    }

    pub fn layout(
        &self,
        dataset: &Dataset,
        sample: &[EquipmentRecord],
        generated_at: DateTime<Utc>,
    ) -> ReportLayout {
        layout::compose(&self.style, dataset, sample, self.sample_cap, generated_at)
    }

    pub fn render(
        &self,
        dataset: &Dataset,
        sample: &[EquipmentRecord],
        generated_at: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        let layout = self.layout(dataset, sample, generated_at);
        let bytes = pdf::encode(&layout, &self.style)?;
        tracing::debug!(
            dataset_id = dataset.id,
            pages = layout.page_count(),
            bytes = bytes.len(),
            "Rendered report"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::summary_aggregator::aggregate;
    use chrono::TimeZone;

    fn fixture(n: usize) -> (Dataset, Vec<EquipmentRecord>) {
        let types = ["Pump", "Valve", "Reactor"];
        let records: Vec<EquipmentRecord> = (0..n)
            .map(|i| EquipmentRecord {
                name: format!("EQ-{}", i + 1),
                equipment_type: types[i % types.len()].to_string(),
                flowrate: 10.0 + i as f64,
                pressure: 2.5,
                temperature: 310.0,
            })
            .collect();
        let summary = aggregate(&records).unwrap();
        let dataset = Dataset {
            id: 11,
            owner: "alice".into(),
            filename: "plant.csv".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            record_count: n as i64,
            avg_flowrate: summary.stats.flowrate.mean,
            avg_pressure: summary.stats.pressure.mean,
            avg_temperature: summary.stats.temperature.mean,
            type_distribution: summary.type_distribution,
            field_stats: summary.stats,
            dropped_rows: 0,
        };
        (dataset, records)
    }

    #[test]
    fn test_same_inputs_render_identical_bytes() {
        let (dataset, records) = fixture(30);
        let renderer = ReportRenderer::new(ReportStyle::default());
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let first = renderer.render(&dataset, &records[..20], at).unwrap();
        let second = renderer.render(&dataset, &records[..20], at).unwrap();
        assert_eq!(first, second);

        let later = renderer
            .render(&dataset, &records[..20], at + chrono::Duration::seconds(1))
            .unwrap();
        assert_ne!(first, later);
    }

    #[test]
    fn test_rendered_pdf_has_pages() {
        let (dataset, records) = fixture(30);
        let renderer = ReportRenderer::new(ReportStyle::default());
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let bytes = renderer.render(&dataset, &records, at).unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let expected = renderer.layout(&dataset, &records, at).page_count();
        assert!(expected >= 1);
        assert_eq!(doc.get_pages().len(), expected);
    }

    #[test]
    fn test_sample_cap_is_configurable() {
        let (dataset, records) = fixture(10);
        let renderer = ReportRenderer::new(ReportStyle::default()).with_sample_cap(3);
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let layout = renderer.layout(&dataset, &records, at);
        let texts = layout.texts();
        assert!(texts.contains(&"EQ-3"));
        assert!(!texts.contains(&"EQ-4"));
        assert!(texts.contains(&"10 total records"));
    }
}
