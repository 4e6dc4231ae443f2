use crate::errors::{DbError, DomainError, ServiceError};
use crate::types::{ConversationId, ParticipantId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Report variants served by the export engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    /// One row per latest vote
    VotesLog,
    /// Participant × statement matrix of flipped vote values
    ParticipantVotes,
    /// Participant × statement matrix of importance flags
    ParticipantImportance,
    /// Participant id → external id
    ParticipantXids,
    /// Key/value conversation aggregates
    Summary,
    /// Per-statement tallies
    Comments,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::VotesLog,
        ReportKind::ParticipantVotes,
        ReportKind::ParticipantImportance,
        ReportKind::ParticipantXids,
        ReportKind::Summary,
        ReportKind::Comments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::VotesLog => "votes",
            ReportKind::ParticipantVotes => "participant-votes",
            ReportKind::ParticipantImportance => "participant-importance",
            ReportKind::ParticipantXids => "participant-xids",
            ReportKind::Summary => "summary",
            ReportKind::Comments => "comments",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }

    pub fn content_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    /// Whether rows are produced from the vote cursor
    pub fn is_streamed(&self) -> bool {
        matches!(
            self,
            ReportKind::VotesLog | ReportKind::ParticipantVotes | ReportKind::ParticipantImportance
        )
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_end_matches(".csv");
        ReportKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| ExportError::InvalidRequest(format!("unknown report '{}'", s)))
    }
}

/// One export call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub conversation_id: ConversationId,
    pub kind: ReportKind,
    /// Adds the `important` column to the votes log
    #[serde(default)]
    pub include_importance: bool,
}

impl ReportRequest {
    pub fn new(conversation_id: ConversationId, kind: ReportKind) -> Self {
        Self {
            conversation_id,
            kind,
            include_importance: false,
        }
    }

    pub fn with_importance(mut self) -> Self {
        self.include_importance = true;
        self
    }
}

/// Export statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStats {
    /// Data rows, header excluded
    pub rows_written: u64,
    pub bytes_written: u64,
    pub votes_read: u64,
    pub duration_ms: u64,
}

/// Export failures.
///
/// Anything returned before the first byte was written leaves the sink
/// untouched. `Truncated` and `ClientDisconnected` mean output was cut short.
#[derive(Debug, Clone, Error, Serialize)]
pub enum ExportError {
    #[error("Not enough data yet: no clustering result for conversation {conversation_id}")]
    UpstreamDataUnavailable { conversation_id: ConversationId },

    #[error("Query error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Client disconnected")]
    ClientDisconnected,

    #[error("Vote stream out of order: participant {next} arrived after participant {previous}")]
    OrderingViolation {
        previous: ParticipantId,
        next: ParticipantId,
    },

    #[error("Export truncated after {rows_written} rows: {reason}")]
    Truncated { rows_written: u64, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Service error: {0}")]
    Service(String),
}

impl ExportError {
    /// Text suitable for showing to the person who asked for the report
    pub fn user_message(&self) -> String {
        match self {
            ExportError::UpstreamDataUnavailable { .. } => {
                "Not enough data yet. This report becomes available once enough participants have voted.".to_string()
            }
            ExportError::NotFound(what) => format!("{} was not found.", what),
            ExportError::InvalidRequest(reason) => format!("Invalid report request: {}.", reason),
            _ => "The report could not be generated.".to_string(),
        }
    }

    pub fn is_client_disconnect(&self) -> bool {
        matches!(self, ExportError::ClientDisconnected)
    }

    /// Whether the failure left a partially written file behind
    pub fn is_mid_stream(&self) -> bool {
        matches!(self, ExportError::Truncated { .. } | ExportError::ClientDisconnected)
    }
}

impl From<DomainError> for ExportError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Database(DbError::NotFound(entity, id)) => {
                ExportError::NotFound(format!("{} {}", entity, id))
            }
            DomainError::Database(DbError::Query(message)) => ExportError::Query(message),
            DomainError::Database(DbError::Migration(message)) => ExportError::Query(message),
            DomainError::Database(DbError::Sqlx(e)) => ExportError::Query(e.to_string()),
            DomainError::EntityNotFound(entity, id) => ExportError::NotFound(format!("{} {}", entity, id)),
            DomainError::Validation(v) => ExportError::Service(v.to_string()),
            DomainError::Internal(msg) => ExportError::Service(msg),
        }
    }
}

impl From<ServiceError> for ExportError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Domain(domain) => domain.into(),
            other => ExportError::Service(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match error.kind() {
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                ExportError::ClientDisconnected
            }
            _ => ExportError::Io(error.to_string()),
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(error: csv::Error) -> Self {
        ExportError::Serialization(error.to_string())
    }
}
