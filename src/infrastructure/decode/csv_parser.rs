// ============================================================
// CSV PARSER
// ============================================================
// Parse CSV uploads with encoding fallback and delimiter detection

use csv::{ReaderBuilder, StringRecord, Trim};

use super::is_na_token;
use crate::domain::equipment::{CellValue, RawTable};
use crate::domain::error::{AppError, Result};

/// CSV parser producing untyped raw tables
pub struct CsvParser {
    /// Delimiter character; detected from the content when `None`
    delimiter: Option<u8>,

    /// Maximum number of lines sampled for delimiter detection
    detection_sample_lines: usize,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            delimiter: None,
            detection_sample_lines: 10,
        }
    }
}

impl CsvParser {
    /// Create a new CSV parser with delimiter auto-detection
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed delimiter instead of detecting one
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Parse raw upload bytes.
    ///
    /// UTF-8 (with or without BOM) is read as-is; anything else falls back
    /// to Windows-1252 so legacy exports still decode.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<RawTable> {
        let content = decode_text(bytes);
        self.parse_content(&content)
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<RawTable> {
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| Self::detect_delimiter(content, self.detection_sample_lines));

        // Only headers are trimmed: cell whitespace is data (e.g. "Pump " is its own type).
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(Trim::Headers)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;
            rows.push(Self::parse_row(&record));
        }

        Ok(RawTable::new(headers, rows))
    }

    fn parse_row(record: &StringRecord) -> Vec<CellValue> {
        record
            .iter()
            .map(|value| {
                if is_na_token(value) {
                    CellValue::Empty
                } else {
                    CellValue::Text(value.to_string())
                }
            })
            .collect()
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    pub fn detect_delimiter(content: &str, sample_lines: usize) -> u8 {
        let candidates = [b',', b';', b'\t', b'|'];
        let lines: Vec<&str> = content.lines().take(sample_lines).collect();

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        if lines.is_empty() {
            return best_delimiter;
        }

        for &delimiter in &candidates {
            let counts: Vec<usize> = lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by frequency, penalised by inconsistency across lines
            let avg = counts.iter().sum::<usize>() as f32 / counts.len() as f32;
            let variance = counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / counts.len() as f32;
            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

fn decode_text(bytes: &[u8]) -> String {
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }

    tracing::debug!("Upload is not valid UTF-8, decoding as Windows-1252");
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text.into_owned()
}
