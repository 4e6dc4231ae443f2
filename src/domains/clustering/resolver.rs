use crate::domains::clustering::types::ClusteringResult;
use crate::types::{BaseClusterId, GroupId, ParticipantId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Opinion group attribution for one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAssignment {
    Assigned(GroupId),
    Unassigned,
}

impl GroupAssignment {
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            GroupAssignment::Assigned(id) => Some(*id),
            GroupAssignment::Unassigned => None,
        }
    }
}

/// Renders as the group id, or as an empty CSV field when unassigned
impl fmt::Display for GroupAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupAssignment::Assigned(id) => write!(f, "{}", id),
            GroupAssignment::Unassigned => Ok(()),
        }
    }
}

/// Id-keyed lookups built once per export from a clustering snapshot.
///
/// Every map is keyed by the identifiers carried in the snapshot; list
/// positions are never used for resolution.
#[derive(Debug, Clone, Default)]
pub struct ClusterResolver {
    participant_to_base: HashMap<ParticipantId, BaseClusterId>,
    base_to_group: HashMap<BaseClusterId, GroupId>,
    in_conversation: BTreeSet<ParticipantId>,
    group_count: usize,
}

impl ClusterResolver {
    pub fn build(result: &ClusteringResult) -> Self {
        let mut participant_to_base = HashMap::new();
        for cluster in result.base_clusters.iter() {
            for &pid in &cluster.members {
                if let Some(previous) = participant_to_base.insert(pid, cluster.id) {
                    if previous != cluster.id {
                        log::warn!(
                            "Participant {} listed in base clusters {} and {}; keeping {}",
                            pid, previous, cluster.id, cluster.id
                        );
                    }
                }
            }
        }

        let mut base_to_group = HashMap::new();
        for group in &result.opinion_groups {
            for &base_id in &group.member_base_cluster_ids {
                if let Some(previous) = base_to_group.insert(base_id, group.id) {
                    if previous != group.id {
                        log::warn!(
                            "Base cluster {} listed in groups {} and {}; keeping {}",
                            base_id, previous, group.id, group.id
                        );
                    }
                }
            }
        }

        log::debug!(
            "Cluster resolver built: {} participants, {} base clusters, {} groups",
            participant_to_base.len(),
            base_to_group.len(),
            result.opinion_groups.len()
        );

        Self {
            participant_to_base,
            base_to_group,
            in_conversation: result.participants_in_conversation.clone(),
            group_count: result.opinion_groups.len(),
        }
    }

    pub fn base_cluster_of(&self, pid: ParticipantId) -> Option<BaseClusterId> {
        self.participant_to_base.get(&pid).copied()
    }

    pub fn group_of_base_cluster(&self, base_id: BaseClusterId) -> Option<GroupId> {
        self.base_to_group.get(&base_id).copied()
    }

    /// Compose both lookups. Never fails: anything unresolved is `Unassigned`.
    pub fn resolve_group(&self, pid: ParticipantId) -> GroupAssignment {
        self.base_cluster_of(pid)
            .and_then(|base_id| self.group_of_base_cluster(base_id))
            .map(GroupAssignment::Assigned)
            .unwrap_or(GroupAssignment::Unassigned)
    }

    pub fn is_in_conversation(&self, pid: ParticipantId) -> bool {
        self.in_conversation.contains(&pid)
    }

    pub fn group_count(&self) -> usize {
        self.group_count
    }
}
