use crate::domains::conversation::types::ParticipantXid;
use crate::domains::statement::types::StatementSummary;
use crate::domains::vote::types::VoteRecord;
use crate::types::{format_report_datetime, millis_to_epoch_seconds, EpochMillis};

/// Trait for fixed-shape rows that can be exported to CSV
pub trait CsvRecord {
    /// Get CSV headers for this type
    fn headers() -> Vec<&'static str>;

    /// Convert to CSV row
    fn to_csv(&self) -> Vec<String>;
}

// Helper for optional values
pub fn csv_optional_to_string<T: std::fmt::Display>(value: &Option<T>) -> String {
    value.as_ref()
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// `timestamp` column: whole seconds since the epoch
pub fn csv_timestamp(millis: Option<EpochMillis>) -> String {
    csv_optional_to_string(&millis.map(millis_to_epoch_seconds))
}

/// `datetime` column
pub fn csv_datetime(millis: Option<EpochMillis>) -> String {
    millis.map(format_report_datetime).unwrap_or_default()
}

impl CsvRecord for ParticipantXid {
    fn headers() -> Vec<&'static str> {
        vec!["participant", "xid"]
    }

    fn to_csv(&self) -> Vec<String> {
        vec![self.participant_id.to_string(), self.xid.clone()]
    }
}

impl CsvRecord for StatementSummary {
    fn headers() -> Vec<&'static str> {
        vec![
            "timestamp",
            "datetime",
            "comment-id",
            "author-id",
            "agrees",
            "disagrees",
            "moderated",
            "comment-body",
        ]
    }

    fn to_csv(&self) -> Vec<String> {
        vec![
            csv_timestamp(Some(self.created)),
            csv_datetime(Some(self.created)),
            self.statement_id.to_string(),
            self.author_participant_id.to_string(),
            self.agrees.to_string(),
            self.disagrees.to_string(),
            self.moderated.to_string(),
            self.body.clone(),
        ]
    }
}

/// Votes log row. The `important` column is optional, so the header
/// depends on the request rather than the type.
pub struct VoteLogRecord<'a> {
    pub vote: &'a VoteRecord,
    pub include_importance: bool,
}

impl VoteLogRecord<'_> {
    pub fn headers(include_importance: bool) -> Vec<&'static str> {
        let mut headers = vec!["timestamp", "datetime", "comment-id", "voter-id", "vote"];
        if include_importance {
            headers.push("important");
        }
        headers
    }

    pub fn to_csv(&self) -> Vec<String> {
        let mut fields = vec![
            csv_timestamp(self.vote.timestamp),
            csv_datetime(self.vote.timestamp),
            self.vote.statement_id.to_string(),
            self.vote.participant_id.to_string(),
            self.vote.report_value().to_string(),
        ];
        if self.include_importance {
            fields.push(if self.vote.important { "1" } else { "0" }.to_string());
        }
        fields
    }
}
