pub mod types;
pub mod repository;
pub mod consumer;

pub use types::VoteRecord;
pub use repository::{MemoryVoteReader, SqliteVoteRepository, VoteStream, VoteStreamReader};
pub use consumer::{drive, VoteConsumer};
