pub mod types;
pub mod repository;

pub use types::{Statement, StatementColumns, StatementSummary};
pub use repository::{SqliteStatementRepository, StatementColumnIndexer, StatementRepository};
