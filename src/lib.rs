pub mod api;
pub mod config;
pub mod ingest;
pub mod render;
pub mod report;
pub mod session;

pub use api::{AnalysisService, ApiError, HttpAnalysisClient, UploadReceipt, report_url};
pub use config::{Config, Questionnaire};
pub use ingest::{
    Column, ColumnType, IngestError, ParsedTable, PreviewTable, RawFile, Record, parse_table,
};
pub use report::{CanonicalReport, ReportError, normalize_report, normalize_str, report_id};
pub use session::{Session, SessionError};
