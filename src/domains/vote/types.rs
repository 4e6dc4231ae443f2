use crate::types::{EpochMillis, ParticipantId, StatementId, VoteValue};
use serde::{Deserialize, Serialize};

/// Latest vote of one participant on one statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub participant_id: ParticipantId,
    pub statement_id: StatementId,
    /// Stored polarity: `-1` agree, `0` pass, `1` disagree
    pub value: VoteValue,
    #[serde(default)]
    pub important: bool,
    pub timestamp: Option<EpochMillis>,
}

impl VoteRecord {
    pub fn new(participant_id: ParticipantId, statement_id: StatementId, value: VoteValue) -> Self {
        Self {
            participant_id,
            statement_id,
            value,
            important: false,
            timestamp: None,
        }
    }

    pub fn important(mut self) -> Self {
        self.important = true;
        self
    }

    pub fn at(mut self, timestamp: EpochMillis) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Value as written to reports: the stored sign flipped, so agree is `1`
    pub fn report_value(&self) -> VoteValue {
        -self.value
    }
}
