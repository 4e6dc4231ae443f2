use crate::domains::clustering::resolver::{ClusterResolver, GroupAssignment};
use crate::domains::export::types::ExportError;
use crate::domains::statement::types::StatementColumns;
use crate::domains::vote::types::VoteRecord;
use crate::types::{ParticipantId, StatementId, VoteValue};
use std::collections::BTreeMap;

/// Which matrix the accumulator is producing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotMode {
    /// Cells carry the flipped vote value
    Votes,
    /// Cells carry `1`/`0` for the importance flag
    Importance,
}

/// Ordering the vote source promises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOrdering {
    /// Participant ascending, one row in flight
    Sorted,
    /// No promise; rows are buffered until `finalize`
    Unsorted,
}

/// One recorded statement vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Report polarity (already flipped)
    pub value: VoteValue,
    pub important: bool,
}

/// A participant's row of the pivoted reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotRow {
    pub participant_id: ParticipantId,
    pub group: GroupAssignment,
    pub statements_authored: usize,
    pub vote_count: u64,
    pub agree_count: u64,
    pub disagree_count: u64,
    pub importance_count: u64,
    cells: BTreeMap<StatementId, Cell>,
}

impl PivotRow {
    fn new(participant_id: ParticipantId, group: GroupAssignment, statements_authored: usize) -> Self {
        Self {
            participant_id,
            group,
            statements_authored,
            vote_count: 0,
            agree_count: 0,
            disagree_count: 0,
            importance_count: 0,
            cells: BTreeMap::new(),
        }
    }

    /// Add a vote. A second vote on the same statement replaces the first.
    pub fn record(&mut self, vote: &VoteRecord) {
        let cell = Cell {
            value: vote.report_value(),
            important: vote.important,
        };
        if let Some(previous) = self.cells.insert(vote.statement_id, cell) {
            log::debug!(
                "Participant {} voted twice on statement {}; keeping the later vote",
                self.participant_id, vote.statement_id
            );
            self.tally(&previous, -1);
        }
        self.tally(&cell, 1);
    }

    fn tally(&mut self, cell: &Cell, direction: i64) {
        let apply = |count: &mut u64| {
            *count = count.saturating_add_signed(direction);
        };
        apply(&mut self.vote_count);
        if cell.value > 0 {
            apply(&mut self.agree_count);
        } else if cell.value < 0 {
            apply(&mut self.disagree_count);
        }
        if cell.important {
            apply(&mut self.importance_count);
        }
    }

    pub fn cell(&self, statement_id: StatementId) -> Option<&Cell> {
        self.cells.get(&statement_id)
    }

    pub fn pass_count(&self) -> u64 {
        self.vote_count - self.agree_count - self.disagree_count
    }

    /// CSV fields in the order of `pivot_header`
    pub fn to_fields(&self, mode: PivotMode, columns: &StatementColumns) -> Vec<String> {
        let mut fields = Vec::with_capacity(columns.len() + 6);
        fields.push(self.participant_id.to_string());
        fields.push(self.group.to_string());
        fields.push(self.statements_authored.to_string());
        fields.push(self.vote_count.to_string());
        match mode {
            PivotMode::Votes => {
                fields.push(self.agree_count.to_string());
                fields.push(self.disagree_count.to_string());
            }
            PivotMode::Importance => fields.push(self.importance_count.to_string()),
        }

        for statement_id in columns.ids() {
            let field = match (self.cells.get(statement_id), mode) {
                (None, _) => String::new(),
                (Some(cell), PivotMode::Votes) => cell.value.to_string(),
                (Some(cell), PivotMode::Importance) => {
                    if cell.important { "1" } else { "0" }.to_string()
                }
            };
            fields.push(field);
        }
        fields
    }
}

pub fn pivot_header(mode: PivotMode, columns: &StatementColumns) -> Vec<String> {
    let fixed: &[&str] = match mode {
        PivotMode::Votes => &["participant", "group-id", "n-comments", "n-votes", "n-agree", "n-disagree"],
        PivotMode::Importance => &["participant", "group-id", "n-comments", "n-votes", "n-important"],
    };
    fixed
        .iter()
        .map(|label| label.to_string())
        .chain(columns.header_labels())
        .collect()
}

/// Folds a participant-ordered vote stream into pivot rows.
///
/// In sorted mode at most one row is held: it is handed back as soon as a
/// vote for the next participant arrives. Unsorted mode keeps every row
/// until `finalize`.
pub struct ParticipantRowAccumulator<'a> {
    columns: &'a StatementColumns,
    resolver: &'a ClusterResolver,
    ordering: StreamOrdering,
    current: Option<PivotRow>,
    buffered: BTreeMap<ParticipantId, PivotRow>,
    last_flushed: Option<ParticipantId>,
    ignored_votes: u64,
}

impl<'a> ParticipantRowAccumulator<'a> {
    pub fn new(columns: &'a StatementColumns, resolver: &'a ClusterResolver, ordering: StreamOrdering) -> Self {
        Self {
            columns,
            resolver,
            ordering,
            current: None,
            buffered: BTreeMap::new(),
            last_flushed: None,
            ignored_votes: 0,
        }
    }

    /// Consume one vote, returning the previous participant's row if this
    /// vote crossed a participant boundary.
    pub fn on_vote_row(&mut self, vote: &VoteRecord) -> Result<Option<PivotRow>, ExportError> {
        if !self.columns.contains(vote.statement_id) {
            log::debug!(
                "Ignoring vote by participant {} on statement {} outside the report columns",
                vote.participant_id, vote.statement_id
            );
            self.ignored_votes += 1;
            return Ok(None);
        }

        match self.ordering {
            StreamOrdering::Sorted => {
                let flushed = self.flush_if_boundary(vote.participant_id)?;
                let (columns, resolver) = (self.columns, self.resolver);
                self.current
                    .get_or_insert_with(|| new_row(columns, resolver, vote.participant_id))
                    .record(vote);
                Ok(flushed)
            }
            StreamOrdering::Unsorted => {
                let (columns, resolver) = (self.columns, self.resolver);
                self.buffered
                    .entry(vote.participant_id)
                    .or_insert_with(|| new_row(columns, resolver, vote.participant_id))
                    .record(vote);
                Ok(None)
            }
        }
    }

    /// Hand back the in-progress row if `next` belongs to another participant.
    pub fn flush_if_boundary(&mut self, next: ParticipantId) -> Result<Option<PivotRow>, ExportError> {
        if self.ordering == StreamOrdering::Unsorted {
            return Ok(None);
        }

        let current_id = self.current.as_ref().map(|row| row.participant_id);
        match current_id {
            Some(id) if id == next => Ok(None),
            Some(id) if next < id => Err(ExportError::OrderingViolation { previous: id, next }),
            Some(id) => {
                self.last_flushed = Some(id);
                Ok(self.current.take())
            }
            None => match self.last_flushed {
                Some(previous) if next <= previous => Err(ExportError::OrderingViolation { previous, next }),
                _ => Ok(None),
            },
        }
    }

    /// Remaining rows in participant order. The accumulator is left idle.
    pub fn finalize(&mut self) -> Vec<PivotRow> {
        if self.ignored_votes > 0 {
            log::debug!("{} votes fell outside the report columns", self.ignored_votes);
        }
        match self.ordering {
            StreamOrdering::Sorted => {
                let rows: Vec<PivotRow> = self.current.take().into_iter().collect();
                if let Some(row) = rows.last() {
                    self.last_flushed = Some(row.participant_id);
                }
                rows
            }
            StreamOrdering::Unsorted => std::mem::take(&mut self.buffered).into_values().collect(),
        }
    }

    pub fn ignored_votes(&self) -> u64 {
        self.ignored_votes
    }
}

fn new_row(columns: &StatementColumns, resolver: &ClusterResolver, participant_id: ParticipantId) -> PivotRow {
    PivotRow::new(
        participant_id,
        resolver.resolve_group(participant_id),
        columns.authored_count(participant_id),
    )
}
