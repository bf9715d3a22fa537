// ============================================================
// TABLE DECODING
// ============================================================
// Boundary adapter: uploaded bytes -> RawTable
// Enforces the upload size limit and the accepted file types

mod csv_parser;
mod xlsx_parser;

pub use csv_parser::CsvParser;
pub use xlsx_parser::parse_workbook;

use std::path::Path;

use crate::domain::equipment::RawTable;
use crate::domain::error::{AppError, Result};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Cell spellings treated as missing, matching pandas' default NA tokens.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub(crate) fn is_na_token(value: &str) -> bool {
    NA_TOKENS.contains(&value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Spreadsheet,
}

impl TableFormat {
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(Self::Spreadsheet),
            _ => Err(AppError::ParseError(format!(
                "Unsupported file type for {}: expected .csv or a spreadsheet",
                filename
            ))),
        }
    }
}

/// Decodes uploads into raw tables
#[derive(Debug, Clone)]
pub struct TableDecoder {
    max_upload_bytes: usize,
}

impl Default for TableDecoder {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl TableDecoder {
    pub fn new(max_upload_bytes: usize) -> Self {
        Self { max_upload_bytes }
    }

    pub fn decode(&self, filename: &str, bytes: &[u8]) -> Result<RawTable> {
        if bytes.len() > self.max_upload_bytes {
            return Err(AppError::UploadTooLarge {
                size: bytes.len(),
                limit: self.max_upload_bytes,
            });
        }

        let table = match TableFormat::from_filename(filename)? {
            TableFormat::Csv => CsvParser::new().parse_bytes(bytes)?,
            TableFormat::Spreadsheet => parse_workbook(bytes)?,
        };

        tracing::debug!(
            filename,
            columns = table.headers.len(),
            rows = table.len(),
            "Decoded upload"
        );
        Ok(table)
    }
}
