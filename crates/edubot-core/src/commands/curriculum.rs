//! Curriculum document administration
//!
//! Uploads are copied into the curriculum directory, which is kept apart
//! from the area learners' files are read from. Their text is extracted once
//! and stored with the record. Removal marks the record deleted and deletes
//! the stored file.

use std::path::Path;

use tracing::{info, warn};

use crate::domain::curriculum::{CurriculumDocument, CurriculumStore, DocumentFilter};
use crate::domain::taxonomy::TaxonomyKind;
use crate::error::{Error, Result};
use crate::extraction::{LocalExtractor, UploadArea, extension_of};
use crate::infrastructure::curriculum::SqliteCurriculumStore;
use crate::storage::Database;

use super::taxonomy::{find_department, find_item};

/// Extensions accepted for curriculum uploads
pub const CURRICULUM_EXTENSIONS: [&str; 4] = ["pdf", "doc", "docx", "txt"];

fn store(db: &Database) -> SqliteCurriculumStore {
    SqliteCurriculumStore::new(db.pool().clone())
}

/// What to upload and where it belongs
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    pub source: &'a Path,
    pub grade: &'a str,
    pub semester: &'a str,
    pub departments: &'a [String],
}

pub async fn upload(
    db: &Database,
    library: &UploadArea,
    request: UploadRequest<'_>,
) -> Result<CurriculumDocument> {
    let extension = extension_of(request.source).unwrap_or_default();
    if !CURRICULUM_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Error::ExtractionUnsupported(format!(
            "curriculum files must be one of {}",
            CURRICULUM_EXTENSIONS.join(", ")
        )));
    }

    let grade = find_item(db, TaxonomyKind::Grade, request.grade).await?;
    let semester = find_item(db, TaxonomyKind::Semester, request.semester).await?;
    if request.departments.is_empty() {
        return Err(Error::InvalidInput(
            "at least one department is required".to_string(),
        ));
    }
    let mut department_ids = Vec::with_capacity(request.departments.len());
    for key in request.departments {
        let id = find_department(db, key).await?.id;
        if !department_ids.contains(&id) {
            department_ids.push(id);
        }
    }

    let original = request
        .source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stored_name = library.import(request.source).await?;
    let stored_path = library.root().join(&stored_name);

    let content = match LocalExtractor::new().read_text(&stored_path).await {
        Ok(content) => content,
        Err(e) => {
            library.remove(&stored_path).await;
            return Err(e);
        }
    };
    let file_size = tokio::fs::metadata(&stored_path).await?.len();

    let document = CurriculumDocument::new(original, content, grade.id, semester.id)
        .with_departments(department_ids)
        .with_stored_file(stored_path.to_string_lossy(), file_size);

    if let Err(e) = store(db).create(&document).await {
        library.remove(&stored_path).await;
        return Err(e);
    }

    info!(
        document_id = %document.id,
        file = %document.original_filename,
        chars = document.content_chars(),
        "Curriculum uploaded"
    );
    Ok(document)
}

/// Active documents, newest first; filters accept ids or names
pub async fn list(
    db: &Database,
    grade: Option<&str>,
    semester: Option<&str>,
    department: Option<&str>,
) -> Result<Vec<CurriculumDocument>> {
    let mut filter = DocumentFilter::default();
    if let Some(grade) = grade {
        filter.grade_id = Some(find_item(db, TaxonomyKind::Grade, grade).await?.id);
    }
    if let Some(semester) = semester {
        filter.semester_id = Some(find_item(db, TaxonomyKind::Semester, semester).await?.id);
    }
    if let Some(department) = department {
        filter.department_id = Some(find_department(db, department).await?.id);
    }
    store(db).list(&filter).await
}

/// Deactivate a document and delete its stored file
pub async fn remove(db: &Database, library: &UploadArea, id: &str) -> Result<CurriculumDocument> {
    let store = store(db);
    let document = store
        .get(id)
        .await?
        .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

    if !store.deactivate(id).await? {
        return Err(Error::DocumentNotFound(id.to_string()));
    }

    if document.stored_path.is_empty() {
        warn!(document_id = %id, "Document has no stored file");
    } else {
        library.remove(Path::new(&document.stored_path)).await;
    }
    Ok(document)
}
