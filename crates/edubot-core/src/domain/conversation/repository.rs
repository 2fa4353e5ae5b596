//! Repository trait for the conversation log

use async_trait::async_trait;

use crate::error::Result;

use super::entity::{ConversationRecord, ConversationStats, HistoryEntry};

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn record(&self, record: &ConversationRecord) -> Result<()>;

    /// Most recent conversations first
    async fn history(&self, limit: u32) -> Result<Vec<HistoryEntry>>;

    async fn stats(&self) -> Result<ConversationStats>;
}
