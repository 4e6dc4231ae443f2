pub mod clustering;
pub mod conversation;
pub mod statement;
pub mod vote;
pub mod export;
