//! Conversation log: every answered request with its provenance

mod entity;
mod repository;

pub use entity::{ConversationRecord, ConversationStats, HistoryEntry};
pub use repository::ConversationRepository;
