//! Uploaded curriculum documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document lifecycle. Content is never edited; a re-upload is a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Active,
    Deleted,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Curriculum text uploaded for a grade and semester, shared by departments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumDocument {
    pub id: String,
    pub original_filename: String,
    pub stored_path: String,
    /// Lowercase file extension (`pdf`, `docx`, `txt`)
    pub file_kind: String,
    pub file_size: u64,
    pub content: String,
    pub grade_id: String,
    pub semester_id: String,
    pub department_ids: Vec<String>,
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
}

impl CurriculumDocument {
    pub fn new(
        original_filename: impl Into<String>,
        content: impl Into<String>,
        grade_id: impl Into<String>,
        semester_id: impl Into<String>,
    ) -> Self {
        let original_filename = original_filename.into();
        let file_kind = original_filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4().to_string(),
            stored_path: String::new(),
            file_kind,
            file_size: 0,
            content: content.into(),
            grade_id: grade_id.into(),
            semester_id: semester_id.into(),
            department_ids: Vec::new(),
            status: DocumentStatus::Active,
            uploaded_at: Utc::now(),
            original_filename,
        }
    }

    pub fn with_departments(mut self, department_ids: Vec<String>) -> Self {
        self.department_ids = department_ids;
        self
    }

    pub fn with_stored_file(mut self, stored_path: impl Into<String>, file_size: u64) -> Self {
        self.stored_path = stored_path.into();
        self.file_size = file_size;
        self
    }

    pub fn content_chars(&self) -> usize {
        self.content.chars().count()
    }
}

/// Optional filters for listing documents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub grade_id: Option<String>,
    pub semester_id: Option<String>,
    pub department_id: Option<String>,
}
