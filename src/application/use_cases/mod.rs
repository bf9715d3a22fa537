// Pipeline stages are pure functions; the services wire them to storage.
pub mod record_normalizer;
pub mod row_validator;
pub mod summary_aggregator;

pub mod ingestion;
pub mod report_renderer;
pub mod report_service;
