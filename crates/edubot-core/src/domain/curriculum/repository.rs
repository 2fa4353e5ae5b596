//! Repository trait for curriculum documents

use async_trait::async_trait;

use crate::domain::taxonomy::QuestionContext;
use crate::error::Result;

use super::entity::{CurriculumDocument, DocumentFilter};

/// Most documents a listing returns
pub const LIST_LIMIT: i64 = 100;

#[async_trait]
pub trait CurriculumStore: Send + Sync {
    /// Content of every active, non-empty document for the full context,
    /// in upload order. Empty when the context is not fully scoped.
    async fn fetch_active_documents(&self, context: &QuestionContext) -> Result<Vec<String>>;

    /// Insert a document with its department links
    async fn create(&self, document: &CurriculumDocument) -> Result<()>;

    /// Active documents matching the filter, newest first, at most [`LIST_LIMIT`]
    async fn list(&self, filter: &DocumentFilter) -> Result<Vec<CurriculumDocument>>;

    async fn get(&self, id: &str) -> Result<Option<CurriculumDocument>>;

    /// Mark deleted and drop department links. False when not active.
    async fn deactivate(&self, id: &str) -> Result<bool>;
}
