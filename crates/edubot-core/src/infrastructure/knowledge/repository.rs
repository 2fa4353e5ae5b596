//! SQLite implementation of the KnowledgeStore

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::domain::knowledge::{KnowledgeEntry, KnowledgeScope, KnowledgeStore};
use crate::error::Result;
use crate::infrastructure::parse_timestamp;

const ENTRY_COLUMNS: &str =
    "id, question, answer, keywords, grade_id, semester_id, department_id, created_at";

/// SQLite implementation of the knowledge base store
#[derive(Clone)]
pub struct SqliteKnowledgeStore {
    pool: SqlitePool,
}

impl SqliteKnowledgeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// `LIKE` pattern for `needle`, or `None` when SQLite cannot match it safely
///
/// `LIKE` folds ASCII case only, so a needle holding other cased letters
/// is left to the matcher. Arabic letters have no case.
pub(crate) fn like_pattern(needle: &str) -> Option<String> {
    if needle.is_empty()
        || needle
            .chars()
            .any(|c| !c.is_ascii() && (c.is_lowercase() || c.is_uppercase()))
    {
        return None;
    }
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

/// Condition on the pattern bound at `?{slot}`; a NULL pattern keeps every row
fn mentions_needle(slot: u8) -> String {
    format!(
        "(?{slot} IS NULL \
         OR question LIKE ?{slot} ESCAPE '\\' \
         OR keywords LIKE ?{slot} ESCAPE '\\' \
         OR answer LIKE ?{slot} ESCAPE '\\')"
    )
}

#[async_trait]
impl KnowledgeStore for SqliteKnowledgeStore {
    async fn query(&self, scope: &KnowledgeScope, needle: &str) -> Result<Vec<KnowledgeEntry>> {
        let pattern = like_pattern(needle);
        // `IS ?` so an unscoped part selects rows where the column is NULL
        let rows: Vec<EntryRow> = match scope {
            KnowledgeScope::Full {
                grade_id,
                semester_id,
                department_id,
            } => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM knowledge_entries \
                     WHERE grade_id IS ?1 AND semester_id IS ?2 AND department_id IS ?3 \
                     AND {} ORDER BY rowid",
                    ENTRY_COLUMNS,
                    mentions_needle(4)
                ))
                .bind(grade_id)
                .bind(semester_id)
                .bind(department_id)
                .bind(&pattern)
                .fetch_all(&self.pool)
                .await?
            }
            KnowledgeScope::GradeSemester {
                grade_id,
                semester_id,
            } => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM knowledge_entries \
                     WHERE grade_id IS ?1 AND semester_id IS ?2 \
                     AND {} ORDER BY rowid",
                    ENTRY_COLUMNS,
                    mentions_needle(3)
                ))
                .bind(grade_id)
                .bind(semester_id)
                .bind(&pattern)
                .fetch_all(&self.pool)
                .await?
            }
        };

        debug!(
            candidates = rows.len(),
            prefiltered = pattern.is_some(),
            "Knowledge scope query"
        );
        Ok(rows.into_iter().map(EntryRow::into_entry).collect())
    }

    async fn add(&self, entry: &KnowledgeEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO knowledge_entries (
                id, question, answer, keywords, grade_id, semester_id, department_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.question)
        .bind(&entry.answer)
        .bind(&entry.keywords)
        .bind(&entry.grade_id)
        .bind(&entry.semester_id)
        .bind(&entry.department_id)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!(entry_id = %entry.id, "Knowledge entry added");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<KnowledgeEntry>> {
        let row: Option<EntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM knowledge_entries WHERE id = ?",
            ENTRY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(EntryRow::into_entry))
    }

    async fn list(&self) -> Result<Vec<KnowledgeEntry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM knowledge_entries ORDER BY rowid DESC",
            ENTRY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EntryRow::into_entry).collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM knowledge_entries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(entry_id = %id, "Knowledge entry deleted");
        }
        Ok(deleted)
    }
}

#[derive(FromRow)]
struct EntryRow {
    id: String,
    question: String,
    answer: String,
    keywords: String,
    grade_id: Option<String>,
    semester_id: Option<String>,
    department_id: Option<String>,
    created_at: String,
}

impl EntryRow {
    fn into_entry(self) -> KnowledgeEntry {
        KnowledgeEntry {
            id: self.id,
            question: self.question,
            answer: self.answer,
            keywords: self.keywords,
            grade_id: self.grade_id,
            semester_id: self.semester_id,
            department_id: self.department_id,
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::knowledge::{KnowledgeMatcher, MatchKind};
    use crate::domain::taxonomy::{Department, QuestionContext, TaxonomyKind, TaxonomyRepository};
    use crate::infrastructure::taxonomy::SqliteTaxonomyRepository;
    use crate::storage::migrations::run_migrations;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

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

    /// Grade and semester from the seed plus two departments
    async fn contexts(pool: &SqlitePool) -> (QuestionContext, QuestionContext) {
        let taxonomy = SqliteTaxonomyRepository::new(pool.clone());
        let grade = taxonomy.list_items(TaxonomyKind::Grade).await.unwrap().remove(0);
        let semester = taxonomy
            .list_items(TaxonomyKind::Semester)
            .await
            .unwrap()
            .remove(0);
        let physics = Department::new("الفيزياء");
        let biology = Department::new("الأحياء");
        taxonomy.add_department(&physics).await.unwrap();
        taxonomy.add_department(&biology).await.unwrap();

        (
            QuestionContext::new(&grade.id, &semester.id, &physics.id),
            QuestionContext::new(&grade.id, &semester.id, &biology.id),
        )
    }

    #[tokio::test]
    async fn test_scope_queries() {
        let pool = setup_test_db().await;
        let store = SqliteKnowledgeStore::new(pool.clone());
        let (physics, biology) = contexts(&pool).await;

        store
            .add(&KnowledgeEntry::new("ما هو قانون أوم؟", "V = IR").with_context(&physics))
            .await
            .unwrap();
        store
            .add(&KnowledgeEntry::new("ما هي الخلية؟", "وحدة الحياة").with_context(&biology))
            .await
            .unwrap();
        store
            .add(&KnowledgeEntry::new("سؤال عام", "إجابة عامة"))
            .await
            .unwrap();

        let full = store.query(&KnowledgeScope::full(&physics), "").await.unwrap();
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].answer, "V = IR");

        let relaxed = store.query(&KnowledgeScope::relaxed(&physics), "").await.unwrap();
        assert_eq!(relaxed.len(), 2);

        let unscoped = store
            .query(&KnowledgeScope::full(&QuestionContext::unscoped()), "")
            .await
            .unwrap();
        assert_eq!(unscoped.len(), 1);
        assert_eq!(unscoped[0].question, "سؤال عام");
    }

    #[tokio::test]
    async fn test_query_narrows_to_entries_mentioning_needle() {
        let pool = setup_test_db().await;
        let store = SqliteKnowledgeStore::new(pool.clone());
        let (physics, _) = contexts(&pool).await;

        for (question, answer, keywords) in [
            ("ما هو قانون أوم؟", "V = IR", ""),
            ("ما هي المقاومة؟", "ممانعة مرور التيار", "قانون"),
            ("ما وحدة الشغل؟", "الجول حسب قانون الطاقة", ""),
            ("ما هي السرعة؟", "المسافة على الزمن", ""),
        ] {
            store
                .add(
                    &KnowledgeEntry::new(question, answer)
                        .with_keywords(keywords)
                        .with_context(&physics),
                )
                .await
                .unwrap();
        }

        let scope = KnowledgeScope::full(&physics);
        let hits = store.query(&scope, "قانون").await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|e| e.question != "ما هي السرعة؟"));

        // LIKE folds ASCII case, so a lowercased needle still finds "V = IR"
        let ascii = store.query(&scope, "v = ir").await.unwrap();
        assert_eq!(ascii.len(), 1);

        // wildcards in the needle are literal
        assert!(store.query(&scope, "%").await.unwrap().is_empty());
        assert_eq!(store.query(&scope, "").await.unwrap().len(), 4);
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern(""), None);
        assert_eq!(like_pattern("قانون").as_deref(), Some("%قانون%"));
        assert_eq!(like_pattern("100%_a\\").as_deref(), Some("%100\\%\\_a\\\\%"));
        // cased letters outside ASCII are left to the matcher
        assert_eq!(like_pattern("закон"), None);
        assert_eq!(like_pattern("élan"), None);
    }

    #[tokio::test]
    async fn test_matcher_over_sqlite() {
        let pool = setup_test_db().await;
        let store = Arc::new(SqliteKnowledgeStore::new(pool.clone()));
        let (physics, biology) = contexts(&pool).await;

        store
            .add(
                &KnowledgeEntry::new("عرف الخلية النباتية", "خلية لها جدار")
                    .with_context(&biology),
            )
            .await
            .unwrap();
        store
            .add(&KnowledgeEntry::new("الخلية", "الوحدة الأساسية").with_context(&biology))
            .await
            .unwrap();

        let matcher = KnowledgeMatcher::new(store.clone());
        let hit = matcher.find(" الخلية ", &biology).await.unwrap().unwrap();
        assert_eq!(hit.kind, MatchKind::ExactQuestion);
        assert_eq!(hit.answer, "الوحدة الأساسية");

        // physics has nothing, the grade+semester pass finds the biology entry
        let relaxed = matcher.find("النباتية", &physics).await.unwrap().unwrap();
        assert!(relaxed.relaxed);
        assert_eq!(relaxed.answer, "خلية لها جدار");

        assert!(matcher.find("الجاذبية", &physics).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_get_delete() {
        let pool = setup_test_db().await;
        let store = SqliteKnowledgeStore::new(pool);

        let first = KnowledgeEntry::new("أول", "1").with_keywords("بداية");
        let second = KnowledgeEntry::new("ثاني", "2");
        store.add(&first).await.unwrap();
        store.add(&second).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(store.get(&first.id).await.unwrap().unwrap().keywords, "بداية");

        assert!(store.delete(&first.id).await.unwrap());
        assert!(!store.delete(&first.id).await.unwrap());
        assert!(store.get(&first.id).await.unwrap().is_none());
    }
}
