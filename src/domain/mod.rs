pub mod equipment;
pub mod error;
pub mod report_style;
