pub mod types;
pub mod csv_record;
pub mod writers;
pub mod accumulator;
pub mod summary;
pub mod service;

pub use types::{ExportError, ExportStats, ReportKind, ReportRequest};
pub use csv_record::CsvRecord;
pub use writers::{CsvConfig, CsvStreamWriter};
pub use accumulator::{ParticipantRowAccumulator, PivotMode, PivotRow, StreamOrdering};
pub use summary::ConversationSummary;
pub use service::ExportService;
