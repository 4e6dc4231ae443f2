use crate::domains::clustering::types::ClusteringResult;
use crate::domains::conversation::types::Conversation;
use serde::{Deserialize, Serialize};

/// Scalar aggregates for the conversation summary report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub topic: String,
    /// Only present when a public conversation URL base is configured
    pub url: Option<String>,
    pub voters: u64,
    pub voters_in_conversation: u64,
    pub commenters: u64,
    pub comments: u64,
    pub groups: u64,
    pub description: String,
}

impl ConversationSummary {
    pub fn build(
        conversation: &Conversation,
        clustering: &ClusteringResult,
        statement_count: i64,
        author_count: i64,
        url_base: Option<&str>,
    ) -> Self {
        Self {
            topic: conversation.topic.clone().unwrap_or_default(),
            url: url_base.map(|base| format!("{}/{}", base, conversation.id)),
            voters: clustering.voter_count() as u64,
            voters_in_conversation: clustering.in_conversation_count() as u64,
            commenters: author_count.max(0) as u64,
            comments: statement_count.max(0) as u64,
            groups: clustering.group_count() as u64,
            description: conversation.description.clone().unwrap_or_default(),
        }
    }

    /// Key/value rows in report order. The report has no header row.
    pub fn rows(&self) -> Vec<[String; 2]> {
        let mut rows = vec![["topic".to_string(), self.topic.clone()]];
        if let Some(url) = &self.url {
            rows.push(["url".to_string(), url.clone()]);
        }
        rows.extend([
            ["voters".to_string(), self.voters.to_string()],
            ["voters-in-conv".to_string(), self.voters_in_conversation.to_string()],
            ["commenters".to_string(), self.commenters.to_string()],
            ["comments".to_string(), self.comments.to_string()],
            ["groups".to_string(), self.groups.to_string()],
            ["conversation-description".to_string(), self.description.clone()],
        ]);
        rows
    }
}
