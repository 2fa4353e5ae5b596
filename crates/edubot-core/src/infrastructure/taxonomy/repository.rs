//! SQLite implementation of the TaxonomyRepository
//!
//! Grades and semesters share one row shape and are addressed by table
//! name. Departments are hard-deleted; foreign keys cascade the grade and
//! curriculum links and null out knowledge and conversation references.

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::domain::taxonomy::{
    ContextLabels, Department, QuestionContext, TaxonomyItem, TaxonomyKind, TaxonomyRepository,
};
use crate::error::Result;
use crate::infrastructure::{parse_timestamp, unique_violation};

/// SQLite implementation of the taxonomy repository
#[derive(Clone)]
pub struct SqliteTaxonomyRepository {
    pool: SqlitePool,
}

impl SqliteTaxonomyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn grade_ids(&self, department_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT grade_id FROM department_grades WHERE department_id = ? ORDER BY rowid",
        )
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn with_grades(&self, rows: Vec<DepartmentRow>) -> Result<Vec<Department>> {
        let mut departments = Vec::with_capacity(rows.len());
        for row in rows {
            let grade_ids = self.grade_ids(&row.id).await?;
            departments.push(row.into_department(grade_ids));
        }
        Ok(departments)
    }

    async fn name_of(&self, table: &str, id: Option<&str>) -> Result<Option<String>> {
        let Some(id) = id else {
            return Ok(None);
        };
        let row: Option<(String,)> =
            sqlx::query_as(&format!("SELECT name FROM {} WHERE id = ?", table))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(name,)| name))
    }
}

#[async_trait]
impl TaxonomyRepository for SqliteTaxonomyRepository {
    // ========== Grades and semesters ==========

    async fn add_item(&self, item: &TaxonomyItem) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO {} (id, name, description, is_active, created_at) VALUES (?, ?, ?, ?, ?)",
            item.kind.table()
        ))
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.is_active)
        .bind(item.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(unique_violation(&item.name))?;

        info!(kind = item.kind.as_str(), id = %item.id, name = %item.name, "Taxonomy item added");
        Ok(())
    }

    async fn list_items(&self, kind: TaxonomyKind) -> Result<Vec<TaxonomyItem>> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT id, name, description, is_active, created_at FROM {} \
             WHERE is_active = 1 ORDER BY rowid",
            kind.table()
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_item(kind)).collect())
    }

    async fn get_item(&self, kind: TaxonomyKind, id: &str) -> Result<Option<TaxonomyItem>> {
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "SELECT id, name, description, is_active, created_at FROM {} WHERE id = ?",
            kind.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_item(kind)))
    }

    async fn deactivate_item(&self, kind: TaxonomyKind, id: &str) -> Result<bool> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET is_active = 0 WHERE id = ? AND is_active = 1",
            kind.table()
        ))
        .bind(id)
        .execute(&self.pool)
        .await?;

        let deactivated = result.rows_affected() > 0;
        if deactivated {
            info!(kind = kind.as_str(), id = %id, "Taxonomy item deactivated");
        }
        Ok(deactivated)
    }

    // ========== Departments ==========

    async fn add_department(&self, department: &Department) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO departments (id, name, description, is_active, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&department.id)
        .bind(&department.name)
        .bind(&department.description)
        .bind(department.is_active)
        .bind(department.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(unique_violation(&department.name))?;

        for grade_id in &department.grade_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO department_grades (department_id, grade_id, created_at) \
                 VALUES (?, ?, ?)",
            )
            .bind(&department.id)
            .bind(grade_id)
            .bind(department.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            id = %department.id,
            name = %department.name,
            grades = department.grade_ids.len(),
            "Department added"
        );
        Ok(())
    }

    async fn list_departments(&self) -> Result<Vec<Department>> {
        let rows: Vec<DepartmentRow> = sqlx::query_as(
            "SELECT id, name, description, is_active, created_at FROM departments \
             WHERE is_active = 1 ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        self.with_grades(rows).await
    }

    async fn get_department(&self, id: &str) -> Result<Option<Department>> {
        let row: Option<DepartmentRow> = sqlx::query_as(
            "SELECT id, name, description, is_active, created_at FROM departments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let grade_ids = self.grade_ids(&row.id).await?;
                Ok(Some(row.into_department(grade_ids)))
            }
            None => Ok(None),
        }
    }

    async fn departments_for_grade(&self, grade_id: &str) -> Result<Vec<Department>> {
        let rows: Vec<DepartmentRow> = sqlx::query_as(
            r#"
            SELECT d.id, d.name, d.description, d.is_active, d.created_at
            FROM departments d
            JOIN department_grades dg ON dg.department_id = d.id
            WHERE dg.grade_id = ? AND d.is_active = 1
            ORDER BY d.name
            "#,
        )
        .bind(grade_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_grades(rows).await
    }

    async fn delete_department(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM departments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(id = %id, "Department deleted");
        }
        Ok(deleted)
    }

    async fn link_department_grade(&self, department_id: &str, grade_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO department_grades (department_id, grade_id, created_at) \
             VALUES (?, ?, ?)",
        )
        .bind(department_id)
        .bind(grade_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let linked = result.rows_affected() > 0;
        debug!(department_id = %department_id, grade_id = %grade_id, linked, "Department link");
        Ok(linked)
    }

    async fn unlink_department_grade(&self, department_id: &str, grade_id: &str) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM department_grades WHERE department_id = ? AND grade_id = ?")
                .bind(department_id)
                .bind(grade_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========== Context ==========

    async fn context_labels(&self, context: &QuestionContext) -> Result<ContextLabels> {
        Ok(ContextLabels {
            grade: self.name_of("grades", context.grade_id.as_deref()).await?,
            semester: self
                .name_of("semesters", context.semester_id.as_deref())
                .await?,
            department: self
                .name_of("departments", context.department_id.as_deref())
                .await?,
        })
    }
}

// ========== Row Types ==========

#[derive(FromRow)]
struct ItemRow {
    id: String,
    name: String,
    description: Option<String>,
    is_active: bool,
    created_at: String,
}

impl ItemRow {
    fn into_item(self, kind: TaxonomyKind) -> TaxonomyItem {
        TaxonomyItem {
            id: self.id,
            kind,
            name: self.name,
            description: self.description,
            is_active: self.is_active,
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

#[derive(FromRow)]
struct DepartmentRow {
    id: String,
    name: String,
    description: Option<String>,
    is_active: bool,
    created_at: String,
}

impl DepartmentRow {
    fn into_department(self, grade_ids: Vec<String>) -> Department {
        Department {
            id: self.id,
            name: self.name,
            description: self.description,
            is_active: self.is_active,
            grade_ids,
            created_at: parse_timestamp(&self.created_at),
        }
    }
}
