//! Grade, semester and department administration

use tracing::info;

use crate::domain::taxonomy::{
    Department, QuestionContext, TaxonomyItem, TaxonomyKind, TaxonomyRepository,
};
use crate::error::{Error, Result};
use crate::infrastructure::taxonomy::SqliteTaxonomyRepository;
use crate::storage::Database;

fn repository(db: &Database) -> SqliteTaxonomyRepository {
    SqliteTaxonomyRepository::new(db.pool().clone())
}

fn not_found(kind: TaxonomyKind, key: &str) -> Error {
    match kind {
        TaxonomyKind::Grade => Error::GradeNotFound(key.to_string()),
        TaxonomyKind::Semester => Error::SemesterNotFound(key.to_string()),
    }
}

fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("name is required".to_string()));
    }
    Ok(name.to_string())
}

// ========== Grades and semesters ==========

pub async fn list_items(db: &Database, kind: TaxonomyKind) -> Result<Vec<TaxonomyItem>> {
    repository(db).list_items(kind).await
}

pub async fn add_item(
    db: &Database,
    kind: TaxonomyKind,
    name: &str,
    description: Option<&str>,
) -> Result<TaxonomyItem> {
    let mut item = TaxonomyItem::new(kind, required_name(name)?);
    if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
        item = item.with_description(description);
    }
    repository(db).add_item(&item).await?;
    Ok(item)
}

/// Deactivate a grade or semester given its id or name
pub async fn remove_item(db: &Database, kind: TaxonomyKind, key: &str) -> Result<TaxonomyItem> {
    let item = find_item(db, kind, key).await?;
    repository(db).deactivate_item(kind, &item.id).await?;
    Ok(item)
}

/// Find an active grade or semester by id or exact name
pub async fn find_item(db: &Database, kind: TaxonomyKind, key: &str) -> Result<TaxonomyItem> {
    let key = key.trim();
    repository(db)
        .list_items(kind)
        .await?
        .into_iter()
        .find(|item| item.id == key || item.name == key)
        .ok_or_else(|| not_found(kind, key))
}

// ========== Departments ==========

/// All departments, or those linked to a grade
pub async fn list_departments(db: &Database, grade: Option<&str>) -> Result<Vec<Department>> {
    match grade {
        Some(grade) => {
            let grade = find_item(db, TaxonomyKind::Grade, grade).await?;
            repository(db).departments_for_grade(&grade.id).await
        }
        None => repository(db).list_departments().await,
    }
}

pub async fn add_department(
    db: &Database,
    name: &str,
    description: Option<&str>,
    grades: &[String],
) -> Result<Department> {
    let mut grade_ids = Vec::with_capacity(grades.len());
    for grade in grades {
        let id = find_item(db, TaxonomyKind::Grade, grade).await?.id;
        if !grade_ids.contains(&id) {
            grade_ids.push(id);
        }
    }

    let mut department = Department::new(required_name(name)?).with_grades(grade_ids);
    if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
        department = department.with_description(description);
    }
    repository(db).add_department(&department).await?;
    Ok(department)
}

/// Find a department by id or exact name
pub async fn find_department(db: &Database, key: &str) -> Result<Department> {
    let key = key.trim();
    repository(db)
        .list_departments()
        .await?
        .into_iter()
        .find(|d| d.id == key || d.name == key)
        .ok_or_else(|| Error::DepartmentNotFound(key.to_string()))
}

pub async fn remove_department(db: &Database, key: &str) -> Result<Department> {
    let department = find_department(db, key).await?;
    repository(db).delete_department(&department.id).await?;
    Ok(department)
}

/// Link a department to a grade; false when already linked
pub async fn link_department(db: &Database, department: &str, grade: &str) -> Result<bool> {
    let department = find_department(db, department).await?;
    let grade = find_item(db, TaxonomyKind::Grade, grade).await?;
    repository(db)
        .link_department_grade(&department.id, &grade.id)
        .await
}

pub async fn unlink_department(db: &Database, department: &str, grade: &str) -> Result<bool> {
    let department = find_department(db, department).await?;
    let grade = find_item(db, TaxonomyKind::Grade, grade).await?;
    repository(db)
        .unlink_department_grade(&department.id, &grade.id)
        .await
}

// ========== Context ==========

/// Build a question context from ids or names; absent parts stay unscoped
pub async fn resolve_context(
    db: &Database,
    grade: Option<&str>,
    semester: Option<&str>,
    department: Option<&str>,
) -> Result<QuestionContext> {
    fn present(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    let grade_id = match present(grade) {
        Some(key) => Some(find_item(db, TaxonomyKind::Grade, key).await?.id),
        None => None,
    };
    let semester_id = match present(semester) {
        Some(key) => Some(find_item(db, TaxonomyKind::Semester, key).await?.id),
        None => None,
    };
    let department_id = match present(department) {
        Some(key) => Some(find_department(db, key).await?.id),
        None => None,
    };

    let context = QuestionContext::from_parts(grade_id, semester_id, department_id);
    info!(fully_scoped = context.is_fully_scoped(), "Resolved question context");
    Ok(context)
}
