//! Repository trait for the curated knowledge base

use async_trait::async_trait;

use crate::error::Result;

use super::entity::{KnowledgeEntry, KnowledgeScope};

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Entries in the scope that may mention `needle`, in insertion order
    ///
    /// `needle` is the normalized question. A store may narrow by it but
    /// must never drop an entry whose question, keywords or answer contain
    /// it after Unicode lowercasing; the matcher does the final ranking.
    async fn query(&self, scope: &KnowledgeScope, needle: &str) -> Result<Vec<KnowledgeEntry>>;

    async fn add(&self, entry: &KnowledgeEntry) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<KnowledgeEntry>>;

    /// All entries, newest first
    async fn list(&self) -> Result<Vec<KnowledgeEntry>>;

    async fn delete(&self, id: &str) -> Result<bool>;
}
