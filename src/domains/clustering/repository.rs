use crate::domains::clustering::types::ClusteringResult;
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::ConversationId;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

/// Source of clustering snapshots
#[async_trait]
pub trait ClusteringRepository: Send + Sync {
    /// Most recent snapshot for a conversation, or `None` when the engine has
    /// not produced one yet.
    async fn latest_for_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> DomainResult<Option<ClusteringResult>>;
}

pub struct SqliteClusteringRepository {
    pool: SqlitePool,
}

impl SqliteClusteringRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClusteringRepository for SqliteClusteringRepository {
    async fn latest_for_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> DomainResult<Option<ClusteringResult>> {
        let row = sqlx::query(
            "SELECT math_tick, data FROM clustering_results
             WHERE conversation_id = ?
             ORDER BY math_tick DESC
             LIMIT 1"
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        let Some(row) = row else {
            log::debug!("No clustering snapshot for conversation {}", conversation_id);
            return Ok(None);
        };

        let math_tick: i64 = row.get("math_tick");
        let data: String = row.get("data");
        log::debug!(
            "Loaded clustering snapshot for conversation {} at tick {}",
            conversation_id, math_tick
        );

        ClusteringResult::from_json(&data)
            .map(Some)
            .map_err(DomainError::Validation)
    }
}
