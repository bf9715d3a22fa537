pub mod use_cases;

pub use use_cases::ingestion::IngestionUseCase;
pub use use_cases::report_service::ReportService;
