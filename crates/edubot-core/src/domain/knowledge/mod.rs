//! Knowledge base domain: curated Q&A entries and the matcher that searches them

mod entity;
mod matcher;
mod repository;

pub use entity::{KnowledgeEntry, KnowledgeScope};
pub use matcher::{KnowledgeMatch, KnowledgeMatcher, MatchKind, normalize, rank_relaxed, rank_scoped};
pub use repository::KnowledgeStore;
