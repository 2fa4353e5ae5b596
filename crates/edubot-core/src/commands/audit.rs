//! Conversation auditing

use crate::domain::conversation::{ConversationRepository, ConversationStats, HistoryEntry};
use crate::error::Result;
use crate::infrastructure::conversation::SqliteConversationRepository;
use crate::storage::Database;

/// Default number of conversations shown by `history`
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

pub async fn history(db: &Database, limit: u32) -> Result<Vec<HistoryEntry>> {
    SqliteConversationRepository::new(db.pool().clone())
        .history(limit)
        .await
}

pub async fn stats(db: &Database) -> Result<ConversationStats> {
    SqliteConversationRepository::new(db.pool().clone())
        .stats()
        .await
}
