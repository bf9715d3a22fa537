// ============================================================
// ROW VALIDATOR
// ============================================================
// Table-wide schema and plausibility checks on raw upload content

use crate::domain::equipment::{NumericField, RawTable, REQUIRED_COLUMNS};
use crate::domain::error::{AppError, Result};

/// Validate a decoded table.
///
/// Rules short-circuit in a fixed order: missing columns, empty table, null
/// numeric cells, then the range checks (flowrate, pressure, temperature).
/// Range checks only see cells that coerce to a number; anything else is left
/// for the normalizer to drop.
pub fn validate(table: &RawTable) -> Result<()> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !table.has_column(col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::SchemaError { missing });
    }

    if table.is_empty() {
        return Err(AppError::EmptyDataset);
    }

    let numeric_columns = numeric_column_indexes(table)?;

    for (field, idx) in &numeric_columns {
        if table.rows.iter().any(|row| row.cell(*idx).is_missing()) {
            return Err(AppError::NullField {
                column: field.column().to_string(),
            });
        }
    }

    for (field, idx) in &numeric_columns {
        let limit = field.lower_bound();
        let violated = table
            .rows
            .iter()
            .filter_map(|row| row.cell(*idx).as_f64())
            .any(|value| value < limit);
        if violated {
            return Err(AppError::RangeError {
                field: *field,
                limit,
            });
        }
    }

    Ok(())
}

fn numeric_column_indexes(table: &RawTable) -> Result<Vec<(NumericField, usize)>> {
    NumericField::ALL
        .iter()
        .map(|field| {
            table
                .column_index(field.column())
                .map(|idx| (*field, idx))
                .ok_or_else(|| AppError::SchemaError {
                    missing: vec![field.column().to_string()],
                })
        })
        .collect()
}
