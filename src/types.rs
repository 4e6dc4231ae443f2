use chrono::{DateTime, TimeZone, Utc};

/// Conversation identifier (`zid`)
pub type ConversationId = i64;

/// Conversation-scoped participant identifier (`pid`)
pub type ParticipantId = i64;

/// Conversation-scoped statement identifier (`tid`)
pub type StatementId = i64;

/// Base cluster identifier as assigned by the clustering engine
pub type BaseClusterId = i64;

/// Opinion group identifier as assigned by the clustering engine
pub type GroupId = i64;

/// Stored vote polarity. `-1` is agree, `1` is disagree, `0` is pass.
pub type VoteValue = i64;

/// Milliseconds since the Unix epoch, as stored in the `created` columns
pub type EpochMillis = i64;

/// Convert a stored millisecond timestamp into a UTC datetime
pub fn millis_to_datetime(millis: EpochMillis) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Whole seconds since the epoch, used by the `timestamp` report columns
pub fn millis_to_epoch_seconds(millis: EpochMillis) -> i64 {
    millis.div_euclid(1000)
}

/// Human readable UTC date used by the `datetime` report columns,
/// e.g. `Mon Jan 01 2024 00:00:00 GMT+0000 (Coordinated Universal Time)`
pub fn format_report_datetime(millis: EpochMillis) -> String {
    millis_to_datetime(millis)
        .map(|dt| {
            dt.format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
                .to_string()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_report_datetime() {
        // 2024-01-01T00:00:00Z
        assert_eq!(
            format_report_datetime(1_704_067_200_000),
            "Mon Jan 01 2024 00:00:00 GMT+0000 (Coordinated Universal Time)"
        );
    }

    #[test]
    fn test_epoch_seconds_truncates() {
        assert_eq!(millis_to_epoch_seconds(1_704_067_200_999), 1_704_067_200);
        assert_eq!(millis_to_epoch_seconds(0), 0);
    }
}
