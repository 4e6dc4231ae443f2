use crate::domains::conversation::types::{Conversation, ParticipantXid};
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::ConversationId;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_id(&self, conversation_id: ConversationId) -> DomainResult<Conversation>;

    /// External identifiers ordered by participant id
    async fn participant_xids(&self, conversation_id: ConversationId) -> DomainResult<Vec<ParticipantXid>>;
}

pub struct SqliteConversationRepository {
    pool: SqlitePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for SqliteConversationRepository {
    async fn find_by_id(&self, conversation_id: ConversationId) -> DomainResult<Conversation> {
        let row = sqlx::query("SELECT id, topic, description FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("Conversation".to_string(), conversation_id))?;

        Ok(Conversation {
            id: row.get("id"),
            topic: row.get("topic"),
            description: row.get("description"),
        })
    }

    async fn participant_xids(&self, conversation_id: ConversationId) -> DomainResult<Vec<ParticipantXid>> {
        let rows = sqlx::query(
            "SELECT pid, xid FROM participant_xids WHERE conversation_id = ? ORDER BY pid ASC"
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| ParticipantXid {
                participant_id: row.get("pid"),
                xid: row.get("xid"),
            })
            .collect())
    }
}
