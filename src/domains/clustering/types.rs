use crate::errors::ValidationError;
use crate::types::{BaseClusterId, GroupId, ParticipantId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A fine-grained cluster. `id` is the engine's identifier, not a list position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseCluster {
    pub id: BaseClusterId,
    #[serde(default)]
    pub members: Vec<ParticipantId>,
}

/// A coarse opinion group built from base clusters (referenced by id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpinionGroup {
    pub id: GroupId,
    #[serde(alias = "members", default)]
    pub member_base_cluster_ids: Vec<BaseClusterId>,
}

/// Snapshot delivered by the clustering engine.
///
/// Treated as plain data: coordinates, centers and any other engine
/// internals in the stored JSON are ignored on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteringResult {
    #[serde(alias = "in-conv", default)]
    pub participants_in_conversation: BTreeSet<ParticipantId>,
    #[serde(alias = "base-clusters", default)]
    pub base_clusters: BaseClusters,
    #[serde(alias = "group-clusters", default)]
    pub opinion_groups: Vec<OpinionGroup>,
    #[serde(alias = "user-vote-counts", default)]
    pub vote_counts_per_participant: HashMap<ParticipantId, i64>,
}

impl ClusteringResult {
    pub fn from_json(raw: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(raw)
            .map_err(|e| ValidationError::invalid_value("clustering_result", &e.to_string()))
    }

    /// Participants with at least one recorded vote
    pub fn voter_count(&self) -> usize {
        self.vote_counts_per_participant
            .values()
            .filter(|count| **count > 0)
            .count()
    }

    pub fn in_conversation_count(&self) -> usize {
        self.participants_in_conversation.len()
    }

    pub fn group_count(&self) -> usize {
        self.opinion_groups.len()
    }
}

/// Ordered list of base clusters.
///
/// Accepts either a list of `{id, members}` objects or the engine's columnar
/// form `{"id": [..], "members": [[..], ..]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BaseClustersRepr")]
#[serde(into = "Vec<BaseCluster>")]
pub struct BaseClusters(pub Vec<BaseCluster>);

impl BaseClusters {
    pub fn iter(&self) -> std::slice::Iter<'_, BaseCluster> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<BaseCluster>> for BaseClusters {
    fn from(clusters: Vec<BaseCluster>) -> Self {
        Self(clusters)
    }
}

impl From<BaseClusters> for Vec<BaseCluster> {
    fn from(clusters: BaseClusters) -> Self {
        clusters.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BaseClustersRepr {
    List(Vec<BaseCluster>),
    Columnar {
        id: Vec<BaseClusterId>,
        #[serde(default)]
        members: Vec<Vec<ParticipantId>>,
    },
}

impl TryFrom<BaseClustersRepr> for BaseClusters {
    type Error = ValidationError;

    fn try_from(repr: BaseClustersRepr) -> Result<Self, Self::Error> {
        match repr {
            BaseClustersRepr::List(clusters) => Ok(Self(clusters)),
            BaseClustersRepr::Columnar { id, members } => {
                if id.len() != members.len() {
                    return Err(ValidationError::invalid_value(
                        "base-clusters",
                        &format!("{} ids but {} member lists", id.len(), members.len()),
                    ));
                }
                Ok(Self(
                    id.into_iter()
                        .zip(members)
                        .map(|(id, members)| BaseCluster { id, members })
                        .collect(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_list_shape() {
        let raw = r#"{
            "participants_in_conversation": [1, 2, 3],
            "base_clusters": [{"id": 55, "members": [1]}, {"id": 66, "members": [2]}],
            "opinion_groups": [{"id": 0, "member_base_cluster_ids": [55, 66]}],
            "vote_counts_per_participant": {"1": 4, "2": 2, "3": 0}
        }"#;
        let result = ClusteringResult::from_json(raw).unwrap();
        assert_eq!(result.base_clusters.len(), 2);
        assert_eq!(result.base_clusters.0[1].id, 66);
        assert_eq!(result.opinion_groups[0].member_base_cluster_ids, vec![55, 66]);
        assert_eq!(result.voter_count(), 2);
        assert_eq!(result.in_conversation_count(), 3);
    }

    #[test]
    fn test_parses_engine_columnar_shape_and_ignores_internals() {
        let raw = r#"{
            "in-conv": [10, 11],
            "base-clusters": {"id": [7, 9], "members": [[10], [11]], "x": [0.1, 0.2], "y": [0.3, 0.4]},
            "group-clusters": [{"id": 1, "members": [7, 9], "center": [0.0, 0.0]}],
            "user-vote-counts": {"10": 3, "11": 1},
            "lastVoteTimestamp": 1700000000000
        }"#;
        let result = ClusteringResult::from_json(raw).unwrap();
        assert_eq!(
            result.base_clusters.0,
            vec![
                BaseCluster { id: 7, members: vec![10] },
                BaseCluster { id: 9, members: vec![11] },
            ]
        );
        assert_eq!(result.opinion_groups[0].member_base_cluster_ids, vec![7, 9]);
        assert_eq!(result.group_count(), 1);
    }

    #[test]
    fn test_columnar_length_mismatch_is_rejected() {
        let raw = r#"{"base-clusters": {"id": [1, 2], "members": [[1]]}}"#;
        let err = ClusteringResult::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("clustering_result"));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let result = ClusteringResult::from_json("{}").unwrap();
        assert!(result.base_clusters.is_empty());
        assert_eq!(result.voter_count(), 0);
    }
}
