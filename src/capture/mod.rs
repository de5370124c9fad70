//! Capture files: per-input record files written during analysis and read back for reporting.

pub mod codec;
pub mod layout;
pub mod reader;
pub mod record;
pub mod writer;

pub use layout::{list_reports, ReportLayout};
pub use reader::{read_header, validate_capture_files, CaptureHeader, CaptureReader};
pub use record::{CaptureLine, CaptureRecord, MetricsLine, Status};
pub use writer::CaptureWriter;
