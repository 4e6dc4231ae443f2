use crate::types::{ConversationId, ParticipantId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub topic: Option<String>,
    pub description: Option<String>,
}

/// External identifier a participant was registered with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantXid {
    pub participant_id: ParticipantId,
    pub xid: String,
}
