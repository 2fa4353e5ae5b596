//! SQLite implementation of the ConversationRepository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, warn};

use crate::domain::conversation::{
    ConversationRecord, ConversationRepository, ConversationStats, HistoryEntry,
};
use crate::domain::resolution::Provenance;
use crate::domain::taxonomy::QuestionContext;
use crate::error::{Error, Result};
use crate::infrastructure::parse_timestamp;

/// SQLite implementation of the conversation log
#[derive(Clone)]
pub struct SqliteConversationRepository {
    pool: SqlitePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for SqliteConversationRepository {
    async fn record(&self, record: &ConversationRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations (
                id, username, question, answer, grade_id, semester_id, department_id,
                provenance, session_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.username)
        .bind(&record.question)
        .bind(&record.answer)
        .bind(&record.context.grade_id)
        .bind(&record.context.semester_id)
        .bind(&record.context.department_id)
        .bind(record.provenance.as_str())
        .bind(&record.session_id)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(
            conversation_id = %record.id,
            provenance = record.provenance.as_str(),
            "Conversation recorded"
        );
        Ok(())
    }

    async fn history(&self, limit: u32) -> Result<Vec<HistoryEntry>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT c.id, c.username, c.question, c.answer,
                   c.grade_id, c.semester_id, c.department_id,
                   c.provenance, c.session_id, c.created_at,
                   g.name AS grade_name, s.name AS semester_name, d.name AS department_name
            FROM conversations c
            LEFT JOIN grades g ON g.id = c.grade_id
            LEFT JOIN semesters s ON s.id = c.semester_id
            LEFT JOIN departments d ON d.id = c.department_id
            ORDER BY c.rowid DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HistoryRow::into_entry).collect()
    }

    async fn stats(&self) -> Result<ConversationStats> {
        let (total, unique_users): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COUNT(DISTINCT username) FROM conversations")
                .fetch_one(&self.pool)
                .await?;

        let midnight = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().to_rfc3339())
            .unwrap_or_default();
        let (today,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM conversations WHERE created_at >= ?")
                .bind(midnight)
                .fetch_one(&self.pool)
                .await?;

        let grouped: Vec<(String, i64)> = sqlx::query_as(
            "SELECT provenance, COUNT(*) AS n FROM conversations \
             GROUP BY provenance ORDER BY n DESC, provenance",
        )
        .fetch_all(&self.pool)
        .await?;

        let by_provenance = grouped
            .into_iter()
            .filter_map(|(name, count)| match Provenance::parse(&name) {
                Some(provenance) => Some((provenance, count as u64)),
                None => {
                    warn!(provenance = %name, "Unknown provenance in conversation log");
                    None
                }
            })
            .collect();

        Ok(ConversationStats {
            total: total as u64,
            unique_users: unique_users as u64,
            today: today as u64,
            by_provenance,
        })
    }
}

#[derive(FromRow)]
struct HistoryRow {
    id: String,
    username: String,
    question: String,
    answer: String,
    grade_id: Option<String>,
    semester_id: Option<String>,
    department_id: Option<String>,
    provenance: String,
    session_id: Option<String>,
    created_at: String,
    grade_name: Option<String>,
    semester_name: Option<String>,
    department_name: Option<String>,
}

impl HistoryRow {
    fn into_entry(self) -> Result<HistoryEntry> {
        let provenance = Provenance::parse(&self.provenance)
            .ok_or_else(|| Error::Other(format!("Invalid provenance: {}", self.provenance)))?;

        Ok(HistoryEntry {
            record: ConversationRecord {
                id: self.id,
                username: self.username,
                question: self.question,
                answer: self.answer,
                context: QuestionContext {
                    grade_id: self.grade_id,
                    semester_id: self.semester_id,
                    department_id: self.department_id,
                },
                provenance,
                session_id: self.session_id,
                created_at: parse_timestamp(&self.created_at),
            },
            grade_name: self.grade_name,
            semester_name: self.semester_name,
            department_name: self.department_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::taxonomy::{TaxonomyKind, TaxonomyRepository};
    use crate::infrastructure::taxonomy::SqliteTaxonomyRepository;
    use crate::storage::migrations::run_migrations;
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool");

        run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    #[tokio::test]
    async fn test_history_resolves_names_newest_first() {
        let pool = setup_test_db().await;
        let repo = SqliteConversationRepository::new(pool.clone());
        let grade = SqliteTaxonomyRepository::new(pool)
            .list_items(TaxonomyKind::Grade)
            .await
            .unwrap()
            .remove(0);

        let first = ConversationRecord::new("sara", "س1", "ج1", Provenance::KnowledgeBase)
            .with_context(QuestionContext::from_parts(Some(grade.id.clone()), None, None));
        let second = ConversationRecord::new("omar", "س2", "ج2", Provenance::Deflection)
            .with_session(Some("session-1".to_string()));
        repo.record(&first).await.unwrap();
        repo.record(&second).await.unwrap();

        let history = repo.history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].record.id, second.id);
        assert_eq!(history[0].record.session_id.as_deref(), Some("session-1"));
        assert_eq!(history[1].grade_name.as_deref(), Some("الصف الأول الثانوي"));
        assert_eq!(history[1].semester_name, None);

        assert_eq!(repo.history(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let pool = setup_test_db().await;
        let repo = SqliteConversationRepository::new(pool);

        let mut old = ConversationRecord::new("sara", "س", "ج", Provenance::Generative);
        old.created_at = Utc::now() - Duration::days(3);
        repo.record(&old).await.unwrap();
        repo.record(&ConversationRecord::new("sara", "س", "ج", Provenance::Generative))
            .await
            .unwrap();
        repo.record(&ConversationRecord::new("omar", "س", "ج", Provenance::KnowledgeBase))
            .await
            .unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.unique_users, 2);
        assert_eq!(stats.today, 2);
        assert_eq!(stats.by_provenance[0], (Provenance::Generative, 2));
        assert_eq!(stats.count_for(Provenance::KnowledgeBase), 1);
        assert_eq!(stats.count_for(Provenance::Error), 0);
    }

    #[tokio::test]
    async fn test_empty_stats() {
        let repo = SqliteConversationRepository::new(setup_test_db().await);
        assert_eq!(repo.stats().await.unwrap(), ConversationStats::default());
    }
}
