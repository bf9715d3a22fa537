use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::equipment::NumericField;

#[derive(Debug, Error, Serialize, Deserialize, PartialEq)]
pub enum AppError {
    #[error("Missing required columns: {}", missing.join(", "))]
    SchemaError { missing: Vec<String> },

    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("Null values found in {column} column")]
    NullField { column: String },

    #[error("{field} values below {limit} found")]
    RangeError { field: NumericField, limit: f64 },

    #[error("No valid rows left after cleaning ({dropped} dropped)")]
    NoValidRows { dropped: usize },

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    UploadTooLarge { size: usize, limit: usize },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl AppError {
    /// Validation and cleaning failures the uploader can fix by changing the file.
    pub fn is_rejected_upload(&self) -> bool {
        matches!(
            self,
            AppError::SchemaError { .. }
                | AppError::EmptyDataset
                | AppError::NullField { .. }
                | AppError::RangeError { .. }
                | AppError::NoValidRows { .. }
                | AppError::ParseError(_)
                | AppError::UploadTooLarge { .. }
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::PersistenceError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
