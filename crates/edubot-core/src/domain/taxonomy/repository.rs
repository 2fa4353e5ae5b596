//! Repository trait for the grade / semester / department taxonomy

use async_trait::async_trait;

use crate::error::Result;

use super::entity::{ContextLabels, Department, QuestionContext, TaxonomyItem, TaxonomyKind};

#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    // ========== Grades and semesters ==========

    /// Insert a grade or semester; a taken name is `DuplicateName`
    async fn add_item(&self, item: &TaxonomyItem) -> Result<()>;

    /// Active items of one kind, oldest first
    async fn list_items(&self, kind: TaxonomyKind) -> Result<Vec<TaxonomyItem>>;

    async fn get_item(&self, kind: TaxonomyKind, id: &str) -> Result<Option<TaxonomyItem>>;

    /// Soft delete. Returns false when nothing active matched.
    async fn deactivate_item(&self, kind: TaxonomyKind, id: &str) -> Result<bool>;

    // ========== Departments ==========

    /// Insert a department together with its grade links
    async fn add_department(&self, department: &Department) -> Result<()>;

    async fn list_departments(&self) -> Result<Vec<Department>>;

    async fn get_department(&self, id: &str) -> Result<Option<Department>>;

    /// Departments linked to a grade
    async fn departments_for_grade(&self, grade_id: &str) -> Result<Vec<Department>>;

    /// Hard delete, removing grade links and curriculum links
    async fn delete_department(&self, id: &str) -> Result<bool>;

    /// Returns false when the link already existed
    async fn link_department_grade(&self, department_id: &str, grade_id: &str) -> Result<bool>;

    async fn unlink_department_grade(&self, department_id: &str, grade_id: &str) -> Result<bool>;

    // ========== Context ==========

    /// Names for each id of the context that resolves
    async fn context_labels(&self, context: &QuestionContext) -> Result<ContextLabels>;
}
