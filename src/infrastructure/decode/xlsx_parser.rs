// ============================================================
// SPREADSHEET PARSER
// ============================================================
// First worksheet of an xlsx/xls/ods upload -> RawTable

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use super::is_na_token;
use crate::domain::equipment::{CellValue, RawTable};
use crate::domain::error::{AppError, Result};

pub fn parse_workbook(bytes: &[u8]) -> Result<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| AppError::ParseError(format!("Failed to open spreadsheet: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::ParseError("No worksheet found".to_string()))?
        .map_err(|e| AppError::ParseError(format!("Failed to read worksheet: {}", e)))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| {
            header
                .iter()
                .map(|cell| header_text(cell).trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    let body: Vec<Vec<CellValue>> = rows
        .filter(|row| !row.iter().all(|cell| matches!(cell, Data::Empty)))
        .map(|row| row.iter().map(to_cell).collect())
        .collect();

    Ok(RawTable::new(headers, body))
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) if is_na_token(s) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_mapping() {
        assert_eq!(to_cell(&Data::Int(4)), CellValue::Number(4.0));
        assert_eq!(to_cell(&Data::Float(1.5)), CellValue::Number(1.5));
        assert_eq!(to_cell(&Data::Bool(true)), CellValue::Bool(true));
        assert_eq!(to_cell(&Data::Empty), CellValue::Empty);
        assert_eq!(to_cell(&Data::String("N/A".into())), CellValue::Empty);
        assert_eq!(
            to_cell(&Data::String("Pump".into())),
            CellValue::Text("Pump".to_string())
        );
    }

    #[test]
    fn test_header_text() {
        assert_eq!(header_text(&Data::String(" Type ".into())), " Type ");
        assert_eq!(header_text(&Data::Empty), "");
    }

    #[test]
    fn test_garbage_bytes_are_a_parse_error() {
        let err = parse_workbook(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }
}
