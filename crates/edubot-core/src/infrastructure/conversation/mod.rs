//! SQLite conversation log

mod repository;

pub use repository::SqliteConversationRepository;
