//! SQLite implementation of the CurriculumStore

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::domain::curriculum::{
    CurriculumDocument, CurriculumStore, DocumentFilter, DocumentStatus, LIST_LIMIT,
};
use crate::domain::taxonomy::QuestionContext;
use crate::error::{Error, Result};
use crate::infrastructure::parse_timestamp;

/// SQLite implementation of the curriculum store
#[derive(Clone)]
pub struct SqliteCurriculumStore {
    pool: SqlitePool,
}

impl SqliteCurriculumStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn department_ids(&self, document_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT department_id FROM curriculum_document_departments \
             WHERE document_id = ? ORDER BY rowid",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl CurriculumStore for SqliteCurriculumStore {
    async fn fetch_active_documents(&self, context: &QuestionContext) -> Result<Vec<String>> {
        let Some((grade_id, semester_id, department_id)) = context.full_scope() else {
            debug!("Context not fully scoped, no curriculum");
            return Ok(Vec::new());
        };

        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT d.content
            FROM curriculum_documents d
            JOIN curriculum_document_departments l ON l.document_id = d.id
            WHERE d.grade_id = ?
              AND d.semester_id = ?
              AND l.department_id = ?
              AND d.status = 'active'
              AND length(trim(d.content)) > 0
            ORDER BY d.rowid
            "#,
        )
        .bind(grade_id)
        .bind(semester_id)
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(documents = rows.len(), "Fetched active curriculum");
        Ok(rows.into_iter().map(|(content,)| content).collect())
    }

    async fn create(&self, document: &CurriculumDocument) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO curriculum_documents (
                id, original_filename, stored_path, file_kind, file_size, content,
                grade_id, semester_id, status, uploaded_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.original_filename)
        .bind(&document.stored_path)
        .bind(&document.file_kind)
        .bind(document.file_size as i64)
        .bind(&document.content)
        .bind(&document.grade_id)
        .bind(&document.semester_id)
        .bind(document.status.as_str())
        .bind(document.uploaded_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for department_id in &document.department_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO curriculum_document_departments (document_id, department_id) \
                 VALUES (?, ?)",
            )
            .bind(&document.id)
            .bind(department_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            document_id = %document.id,
            file = %document.original_filename,
            chars = document.content_chars(),
            departments = document.department_ids.len(),
            "Curriculum document stored"
        );
        Ok(())
    }

    async fn list(&self, filter: &DocumentFilter) -> Result<Vec<CurriculumDocument>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            r#"
            SELECT d.id, d.original_filename, d.stored_path, d.file_kind, d.file_size,
                   d.content, d.grade_id, d.semester_id, d.status, d.uploaded_at
            FROM curriculum_documents d
            WHERE d.status = 'active'
              AND (?1 IS NULL OR d.grade_id = ?1)
              AND (?2 IS NULL OR d.semester_id = ?2)
              AND (?3 IS NULL OR EXISTS (
                    SELECT 1 FROM curriculum_document_departments l
                    WHERE l.document_id = d.id AND l.department_id = ?3))
            ORDER BY d.rowid DESC
            LIMIT ?4
            "#,
        )
        .bind(&filter.grade_id)
        .bind(&filter.semester_id)
        .bind(&filter.department_id)
        .bind(LIST_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let department_ids = self.department_ids(&row.id).await?;
            documents.push(row.into_document(department_ids)?);
        }
        Ok(documents)
    }

    async fn get(&self, id: &str) -> Result<Option<CurriculumDocument>> {
        let row: Option<DocumentRow> = sqlx::query_as(
            r#"
            SELECT id, original_filename, stored_path, file_kind, file_size,
                   content, grade_id, semester_id, status, uploaded_at
            FROM curriculum_documents WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let department_ids = self.department_ids(&row.id).await?;
                row.into_document(department_ids).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn deactivate(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE curriculum_documents SET status = 'deleted' WHERE id = ? AND status = 'active'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM curriculum_document_departments WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(document_id = %id, "Curriculum document deactivated");
        Ok(true)
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: String,
    original_filename: String,
    stored_path: String,
    file_kind: String,
    file_size: i64,
    content: String,
    grade_id: String,
    semester_id: String,
    status: String,
    uploaded_at: String,
}

impl DocumentRow {
    fn into_document(self, department_ids: Vec<String>) -> Result<CurriculumDocument> {
        let status = DocumentStatus::parse(&self.status)
            .ok_or_else(|| Error::Other(format!("Invalid document status: {}", self.status)))?;

        Ok(CurriculumDocument {
            id: self.id,
            original_filename: self.original_filename,
            stored_path: self.stored_path,
            file_kind: self.file_kind,
            file_size: self.file_size.max(0) as u64,
            content: self.content,
            grade_id: self.grade_id,
            semester_id: self.semester_id,
            department_ids,
            status,
            uploaded_at: parse_timestamp(&self.uploaded_at),
        })
    }
}
