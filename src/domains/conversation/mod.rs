pub mod types;
pub mod repository;

pub use types::{Conversation, ParticipantXid};
pub use repository::{ConversationRepository, SqliteConversationRepository};
