//! Chemical equipment analytics.
//!
//! An upload flows through validation, normalization and aggregation before
//! it is committed as an owner-scoped dataset; stored datasets can then be
//! rendered as PDF reports.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

pub use application::use_cases::ingestion::{IngestOutcome, IngestionUseCase};
pub use application::use_cases::report_renderer::ReportRenderer;
pub use application::use_cases::report_service::{RenderedReport, ReportService};
pub use domain::equipment::{Dataset, EquipmentRecord, RawTable};
pub use domain::error::{AppError, Result};
pub use domain::report_style::ReportStyle;
pub use infrastructure::config::AppConfig;
pub use infrastructure::db::{DatasetRepository, DatasetStore, EquipmentDb};
pub use infrastructure::decode::TableDecoder;
