// ============================================================
// RECORD NORMALIZER
// ============================================================
// Coerce validated raw rows into typed equipment records
//
// This is a lossy cleaning pass. A table can pass validation and still lose
// rows here: any row with a missing cell, or with a numeric cell that does not
// coerce to a finite float, is dropped instead of failing the batch. The
// number of dropped rows is reported in `NormalizedRecords::dropped`.

use crate::domain::equipment::{
    EquipmentRecord, NumericField, RawRow, RawTable, COL_EQUIPMENT_NAME, COL_TYPE,
};
use crate::domain::error::{AppError, Result};

/// Normalizer output: surviving records in input order, plus the drop count
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecords {
    pub records: Vec<EquipmentRecord>,
    pub dropped: usize,
}

impl NormalizedRecords {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

struct ColumnMap {
    name: usize,
    equipment_type: usize,
    flowrate: usize,
    pressure: usize,
    temperature: usize,
}

impl ColumnMap {
    fn resolve(table: &RawTable) -> Result<Self> {
        let find = |col: &str| {
            table
                .column_index(col)
                .ok_or_else(|| AppError::SchemaError {
                    missing: vec![col.to_string()],
                })
        };

        Ok(Self {
            name: find(COL_EQUIPMENT_NAME)?,
            equipment_type: find(COL_TYPE)?,
            flowrate: find(NumericField::Flowrate.column())?,
            pressure: find(NumericField::Pressure.column())?,
            temperature: find(NumericField::Temperature.column())?,
        })
    }
}

/// Normalize a table that already passed `row_validator::validate`.
///
/// Errors only if the required columns cannot be resolved, which validation
/// rules out. Row-level problems never fail the call.
pub fn normalize(table: &RawTable) -> Result<NormalizedRecords> {
    let columns = ColumnMap::resolve(table)?;

    let records: Vec<EquipmentRecord> = table
        .rows
        .iter()
        .filter(|row| !row.has_missing())
        .filter_map(|row| to_record(row, &columns))
        .collect();

    let dropped = table.len() - records.len();
    if dropped > 0 {
        tracing::debug!(dropped, total = table.len(), "Dropped unconvertible rows");
    }

    Ok(NormalizedRecords { records, dropped })
}

fn to_record(row: &RawRow, columns: &ColumnMap) -> Option<EquipmentRecord> {
    let number = |idx: usize| row.cell(idx).as_f64().filter(|n| n.is_finite());

    Some(EquipmentRecord {
        name: row.cell(columns.name).to_text(),
        equipment_type: row.cell(columns.equipment_type).to_text(),
        flowrate: number(columns.flowrate)?,
        pressure: number(columns.pressure)?,
        temperature: number(columns.temperature)?,
    })
}
