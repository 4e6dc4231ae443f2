pub mod types;
pub mod resolver;
pub mod repository;

pub use types::{BaseCluster, BaseClusters, ClusteringResult, OpinionGroup};
pub use resolver::{ClusterResolver, GroupAssignment};
pub use repository::{ClusteringRepository, SqliteClusteringRepository};
