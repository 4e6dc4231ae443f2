use crate::types::{EpochMillis, ParticipantId, StatementId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An authored statement that defines a report column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub statement_id: StatementId,
    pub author_participant_id: ParticipantId,
}

/// Ordered statement columns for the pivoted reports.
///
/// Independent of vote activity: the same statements produce the same
/// header whether or not anyone has voted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementColumns {
    ids: Vec<StatementId>,
    authors: HashMap<StatementId, ParticipantId>,
    authored_counts: HashMap<ParticipantId, usize>,
}

impl StatementColumns {
    /// Build from statements in any order; columns come out ascending by id
    pub fn from_statements(statements: impl IntoIterator<Item = Statement>) -> Self {
        let mut authors = HashMap::new();
        for statement in statements {
            authors.insert(statement.statement_id, statement.author_participant_id);
        }

        let mut ids: Vec<StatementId> = authors.keys().copied().collect();
        ids.sort_unstable();

        let mut authored_counts = HashMap::new();
        for author in authors.values() {
            *authored_counts.entry(*author).or_insert(0) += 1;
        }

        Self { ids, authors, authored_counts }
    }

    pub fn ids(&self) -> &[StatementId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, statement_id: StatementId) -> bool {
        self.authors.contains_key(&statement_id)
    }

    pub fn author_of(&self, statement_id: StatementId) -> Option<ParticipantId> {
        self.authors.get(&statement_id).copied()
    }

    /// Number of column statements written by the participant (`n-comments`)
    pub fn authored_count(&self, participant_id: ParticipantId) -> usize {
        self.authored_counts.get(&participant_id).copied().unwrap_or(0)
    }

    /// Distinct participants who authored at least one column statement
    pub fn author_count(&self) -> usize {
        self.authored_counts.len()
    }

    pub fn header_labels(&self) -> impl Iterator<Item = String> + '_ {
        self.ids.iter().map(|id| id.to_string())
    }
}

/// Per-statement row of the comments report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementSummary {
    pub statement_id: StatementId,
    pub author_participant_id: ParticipantId,
    pub created: EpochMillis,
    /// Counts use the report polarity (stored `-1` counts as agree)
    pub agrees: i64,
    pub disagrees: i64,
    pub moderated: i64,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(statement_id: i64, author_participant_id: i64) -> Statement {
        Statement { statement_id, author_participant_id }
    }

    #[test]
    fn test_columns_sorted_and_authors_counted() {
        let columns = StatementColumns::from_statements(vec![
            statement(3, 2),
            statement(1, 1),
            statement(2, 1),
        ]);
        assert_eq!(columns.ids(), &[1, 2, 3]);
        assert_eq!(columns.authored_count(1), 2);
        assert_eq!(columns.authored_count(2), 1);
        assert_eq!(columns.authored_count(99), 0);
        assert_eq!(columns.author_count(), 2);
        assert_eq!(columns.author_of(3), Some(2));
        assert_eq!(columns.header_labels().collect::<Vec<_>>(), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_empty_conversation_has_no_columns() {
        let columns = StatementColumns::from_statements(Vec::new());
        assert!(columns.is_empty());
        assert!(!columns.contains(1));
    }
}
