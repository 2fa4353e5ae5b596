//! SQLite knowledge base store

mod repository;

pub use repository::SqliteKnowledgeStore;
