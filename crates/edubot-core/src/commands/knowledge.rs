//! Knowledge base administration

use std::sync::Arc;

use crate::domain::knowledge::{KnowledgeEntry, KnowledgeStore};
use crate::domain::taxonomy::QuestionContext;
use crate::error::{Error, Result};
use crate::infrastructure::knowledge::SqliteKnowledgeStore;
use crate::storage::Database;

fn store(db: &Database) -> Arc<SqliteKnowledgeStore> {
    Arc::new(SqliteKnowledgeStore::new(db.pool().clone()))
}

pub async fn add_entry(
    db: &Database,
    question: &str,
    answer: &str,
    keywords: Option<&str>,
    context: &QuestionContext,
) -> Result<KnowledgeEntry> {
    let (question, answer) = (question.trim(), answer.trim());
    if question.is_empty() || answer.is_empty() {
        return Err(Error::InvalidInput(
            "both a question and an answer are required".to_string(),
        ));
    }

    let entry = KnowledgeEntry::new(question, answer)
        .with_keywords(keywords.unwrap_or_default().trim())
        .with_context(context);
    store(db).add(&entry).await?;
    Ok(entry)
}

pub async fn list_entries(db: &Database) -> Result<Vec<KnowledgeEntry>> {
    store(db).list().await
}

pub async fn remove_entry(db: &Database, id: &str) -> Result<()> {
    if store(db).delete(id).await? {
        Ok(())
    } else {
        Err(Error::KnowledgeEntryNotFound(id.to_string()))
    }
}
