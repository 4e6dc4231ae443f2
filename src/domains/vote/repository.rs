use crate::domains::vote::types::VoteRecord;
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::{ConversationId, ParticipantId, StatementId};
use futures::stream::{self, Stream, StreamExt};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, SqlitePool};
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

/// Stream of latest votes for one conversation
pub type VoteStream = Pin<Box<dyn Stream<Item = DomainResult<VoteRecord>> + Send>>;

/// Ordered cursor over the latest-vote relation
pub trait VoteStreamReader: Send + Sync {
    /// Votes ordered by participant id, then statement id, restricted to
    /// active, non-banned statements. Dropping the stream cancels the cursor.
    fn stream(&self, conversation_id: ConversationId) -> VoteStream;

    /// Whether `stream` really yields participant-then-statement order.
    /// Consumers buffer per participant when it does not.
    fn guarantees_order(&self) -> bool {
        true
    }
}

/// Keyset-paginated reader over the `votes_latest` view.
///
/// Batches are fetched by a spawned task into a bounded channel, so a slow
/// consumer pauses the cursor instead of growing a buffer.
pub struct SqliteVoteRepository {
    pool: SqlitePool,
    batch_size: usize,
    channel_capacity: usize,
    query_timeout: Duration,
}

impl SqliteVoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            batch_size: 1000,
            channel_capacity: 16,
            query_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity.max(1);
        self
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }
}

/// Position after the last delivered row
#[derive(Debug, Clone, Copy)]
struct VoteCursor {
    participant_id: ParticipantId,
    statement_id: StatementId,
}

impl VoteCursor {
    fn start() -> Self {
        Self {
            participant_id: ParticipantId::MIN,
            statement_id: StatementId::MIN,
        }
    }
}

async fn fetch_batch(
    pool: &SqlitePool,
    conversation_id: ConversationId,
    cursor: VoteCursor,
    limit: usize,
    query_timeout: Duration,
) -> DomainResult<Vec<VoteRecord>> {
    let mut query = QueryBuilder::new(
        "SELECT v.pid, v.tid, v.vote, v.high_priority, v.created
         FROM votes_latest v
         JOIN statements s ON s.conversation_id = v.conversation_id AND s.tid = v.tid
         WHERE v.conversation_id = "
    );
    query.push_bind(conversation_id);
    query.push(" AND s.active = 1 AND s.moderation >= 0 AND (v.pid > ");
    query.push_bind(cursor.participant_id);
    query.push(" OR (v.pid = ");
    query.push_bind(cursor.participant_id);
    query.push(" AND v.tid > ");
    query.push_bind(cursor.statement_id);
    query.push(")) ORDER BY v.pid ASC, v.tid ASC LIMIT ");
    query.push_bind(limit as i64);

    let rows = tokio::time::timeout(query_timeout, query.build().fetch_all(pool))
        .await
        .map_err(|_| {
            DbError::Query(format!(
                "vote batch for conversation {} timed out after {:?}",
                conversation_id, query_timeout
            ))
        })?
        .map_err(DbError::from)?;

    rows.iter().map(decode_vote).collect()
}

fn decode_vote(row: &SqliteRow) -> DomainResult<VoteRecord> {
    let decode = |e: sqlx::Error| DbError::Query(format!("malformed vote row: {}", e));
    Ok(VoteRecord {
        participant_id: row.try_get("pid").map_err(decode)?,
        statement_id: row.try_get("tid").map_err(decode)?,
        value: row.try_get("vote").map_err(decode)?,
        important: row.try_get::<Option<i64>, _>("high_priority").map_err(decode)?.unwrap_or(0) != 0,
        timestamp: row.try_get("created").map_err(decode)?,
    })
}

/// Channel receiver followed by the producer's exit status.
///
/// A producer that dies without reporting (a panic, or the runtime
/// cancelling it) turns into a trailing error item, so a short stream is
/// never mistaken for a complete one.
fn stream_with_producer(rx: mpsc::Receiver<DomainResult<VoteRecord>>, producer: JoinHandle<()>) -> VoteStream {
    let exit = stream::once(producer).filter_map(|joined| async move {
        match joined {
            Ok(()) => None,
            Err(e) => {
                log::error!("Vote cursor task did not finish: {}", e);
                Some(Err(DomainError::Database(DbError::Query(format!(
                    "vote cursor stopped unexpectedly: {}",
                    e
                )))))
            }
        }
    });
    Box::pin(ReceiverStream::new(rx).chain(exit))
}

impl SqliteVoteRepository {
    /// Start the cursor task. It ends after the last batch, after sending a
    /// query error, or as soon as the receiver is dropped.
    fn spawn_cursor(
        &self,
        conversation_id: ConversationId,
    ) -> (mpsc::Receiver<DomainResult<VoteRecord>>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let pool = self.pool.clone();
        let batch_size = self.batch_size;
        let query_timeout = self.query_timeout;

        let producer = tokio::spawn(async move {
            let mut cursor = VoteCursor::start();
            let mut total_sent: u64 = 0;

            log::debug!(
                "Starting vote stream for conversation {}, batch_size: {}",
                conversation_id, batch_size
            );

            loop {
                let batch = match fetch_batch(&pool, conversation_id, cursor, batch_size, query_timeout).await {
                    Ok(batch) => batch,
                    Err(e) => {
                        log::error!("Vote query failed for conversation {}: {}", conversation_id, e);
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };

                let batch_len = batch.len();
                for vote in batch {
                    cursor = VoteCursor {
                        participant_id: vote.participant_id,
                        statement_id: vote.statement_id,
                    };
                    if tx.send(Ok(vote)).await.is_err() {
                        log::debug!(
                            "Vote stream receiver dropped after {} rows, closing cursor",
                            total_sent
                        );
                        return;
                    }
                    total_sent += 1;
                }

                if batch_len < batch_size {
                    break;
                }

                tokio::task::yield_now().await;
            }

            log::debug!(
                "Vote stream completed for conversation {}. Total rows: {}",
                conversation_id, total_sent
            );
        });

        (rx, producer)
    }
}

impl VoteStreamReader for SqliteVoteRepository {
    fn stream(&self, conversation_id: ConversationId) -> VoteStream {
        let (rx, producer) = self.spawn_cursor(conversation_id);
        stream_with_producer(rx, producer)
    }
}

/// Reader over votes already held in memory
pub struct MemoryVoteReader {
    votes: Vec<VoteRecord>,
    ordered: bool,
}

impl MemoryVoteReader {
    /// Votes are sorted into participant-then-statement order
    pub fn sorted(mut votes: Vec<VoteRecord>) -> Self {
        votes.sort_by_key(|v| (v.participant_id, v.statement_id));
        Self { votes, ordered: true }
    }

    /// Votes are replayed as given and advertised as unordered
    pub fn unordered(votes: Vec<VoteRecord>) -> Self {
        Self { votes, ordered: false }
    }
}

impl VoteStreamReader for MemoryVoteReader {
    fn stream(&self, _conversation_id: ConversationId) -> VoteStream {
        let votes: Vec<Result<VoteRecord, DomainError>> = self.votes.iter().copied().map(Ok).collect();
        Box::pin(stream::iter(votes))
    }

    fn guarantees_order(&self) -> bool {
        self.ordered
    }
}
