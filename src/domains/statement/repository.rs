use crate::domains::statement::types::{Statement, StatementColumns, StatementSummary};
use crate::errors::{DbError, DomainResult};
use crate::types::ConversationId;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

/// Produces the statement columns for a conversation
#[async_trait]
pub trait StatementColumnIndexer: Send + Sync {
    /// All active, non-banned statements ordered by id. An empty
    /// conversation yields empty columns.
    async fn index(&self, conversation_id: ConversationId) -> DomainResult<StatementColumns>;
}

/// Statement queries used by the reports
#[async_trait]
pub trait StatementRepository: StatementColumnIndexer {
    /// Every statement, moderated ones included, with latest-vote tallies
    async fn summaries(&self, conversation_id: ConversationId) -> DomainResult<Vec<StatementSummary>>;

    /// Number of statements in the conversation, moderated ones included
    async fn count_all(&self, conversation_id: ConversationId) -> DomainResult<i64>;

    /// Distinct statement authors, moderated statements included
    async fn count_authors(&self, conversation_id: ConversationId) -> DomainResult<i64>;
}

pub struct SqliteStatementRepository {
    pool: SqlitePool,
}

impl SqliteStatementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatementColumnIndexer for SqliteStatementRepository {
    async fn index(&self, conversation_id: ConversationId) -> DomainResult<StatementColumns> {
        let rows = sqlx::query(
            "SELECT tid, pid FROM statements
             WHERE conversation_id = ? AND active = 1 AND moderation >= 0
             ORDER BY tid ASC"
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        let columns = StatementColumns::from_statements(rows.iter().map(|row| Statement {
            statement_id: row.get("tid"),
            author_participant_id: row.get("pid"),
        }));

        log::debug!(
            "Indexed {} statement columns for conversation {}",
            columns.len(),
            conversation_id
        );
        Ok(columns)
    }
}

#[async_trait]
impl StatementRepository for SqliteStatementRepository {
    async fn summaries(&self, conversation_id: ConversationId) -> DomainResult<Vec<StatementSummary>> {
        let rows = sqlx::query(
            r#"
                SELECT
                    s.tid, s.pid, s.created, s.moderation, s.body,
                    COALESCE(SUM(CASE WHEN v.vote = -1 THEN 1 ELSE 0 END), 0) AS agrees,
                    COALESCE(SUM(CASE WHEN v.vote = 1 THEN 1 ELSE 0 END), 0) AS disagrees
                FROM statements s
                LEFT JOIN votes_latest v
                    ON v.conversation_id = s.conversation_id AND v.tid = s.tid
                WHERE s.conversation_id = ?
                GROUP BY s.tid, s.pid, s.created, s.moderation, s.body
                ORDER BY s.tid ASC
            "#
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| StatementSummary {
                statement_id: row.get("tid"),
                author_participant_id: row.get("pid"),
                created: row.get("created"),
                agrees: row.get("agrees"),
                disagrees: row.get("disagrees"),
                moderated: row.get("moderation"),
                body: row.get("body"),
            })
            .collect())
    }

    async fn count_all(&self, conversation_id: ConversationId) -> DomainResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM statements WHERE conversation_id = ?"
        )
        .bind(conversation_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(count)
    }

    async fn count_authors(&self, conversation_id: ConversationId) -> DomainResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT pid) FROM statements WHERE conversation_id = ?"
        )
        .bind(conversation_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(count)
    }
}
