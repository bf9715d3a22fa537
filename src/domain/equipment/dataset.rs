use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::NumericField;

/// Descriptive statistics for one numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation (N-1). `None` when only one record survived.
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistics {
    pub flowrate: FieldStats,
    pub pressure: FieldStats,
    pub temperature: FieldStats,
}

impl FieldStatistics {
    pub fn get(&self, field: NumericField) -> &FieldStats {
        match field {
            NumericField::Flowrate => &self.flowrate,
            NumericField::Pressure => &self.pressure,
            NumericField::Temperature => &self.temperature,
        }
    }
}

/// Aggregator output for a non-empty record set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub record_count: usize,
    pub stats: FieldStatistics,
    /// Occurrences per equipment type. Keys are kept verbatim (case and whitespace).
    pub type_distribution: BTreeMap<String, i64>,
}

/// Everything the repository needs to create a dataset besides its records
#[derive(Debug, Clone)]
pub struct DatasetInput {
    pub owner: String,
    pub filename: String,
    pub summary: DatasetSummary,
    pub dropped_rows: usize,
}

/// One committed upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    pub owner: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub record_count: i64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub type_distribution: BTreeMap<String, i64>,
    pub field_stats: FieldStatistics,
    pub dropped_rows: i64,
}

impl Dataset {
    pub fn average(&self, field: NumericField) -> f64 {
        match field {
            NumericField::Flowrate => self.avg_flowrate,
            NumericField::Pressure => self.avg_pressure,
            NumericField::Temperature => self.avg_temperature,
        }
    }

    /// Distribution ordered by count (descending), then type name.
    pub fn distribution_by_count(&self) -> Vec<(&str, i64)> {
        let mut entries: Vec<(&str, i64)> = self
            .type_distribution
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Share of `count` in the whole dataset, in percent. Unrounded; display
    /// code rounds once with `{:.1}`.
    pub fn percentage(&self, count: i64) -> f64 {
        if self.record_count <= 0 {
            return 0.0;
        }
        count as f64 / self.record_count as f64 * 100.0
    }

    pub fn report_file_name(&self) -> String {
        format!("equipment_report_{}_{}.pdf", self.filename, self.id)
    }
}
