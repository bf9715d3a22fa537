// ============================================================
// EQUIPMENT DOMAIN LAYER
// ============================================================
// Core types for equipment uploads, records and dataset summaries
// No I/O, no async

mod dataset;
mod raw_table;
mod record;

pub use dataset::{Dataset, DatasetInput, DatasetSummary, FieldStatistics, FieldStats};
pub use raw_table::{CellValue, RawRow, RawTable};
pub use record::{EquipmentRecord, NumericField};

pub const COL_EQUIPMENT_NAME: &str = "Equipment Name";
pub const COL_TYPE: &str = "Type";
pub const COL_FLOWRATE: &str = "Flowrate";
pub const COL_PRESSURE: &str = "Pressure";
pub const COL_TEMPERATURE: &str = "Temperature";

/// Columns every upload must carry, in the order they are reported when missing.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    COL_EQUIPMENT_NAME,
    COL_TYPE,
    COL_FLOWRATE,
    COL_PRESSURE,
    COL_TEMPERATURE,
];

/// Absolute zero in the working temperature unit.
pub const ABSOLUTE_ZERO: f64 = -273.15;
