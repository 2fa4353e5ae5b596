//! Grades, semesters, departments and the question context built from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder shown for a context label that was not supplied
pub const UNSPECIFIED_LABEL: &str = "غير محدد";

/// The two flat taxonomy levels that share one shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyKind {
    Grade,
    Semester,
}

impl TaxonomyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grade => "grade",
            Self::Semester => "semester",
        }
    }

    pub(crate) fn table(&self) -> &'static str {
        match self {
            Self::Grade => "grades",
            Self::Semester => "semesters",
        }
    }
}

impl std::fmt::Display for TaxonomyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grade or a semester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyItem {
    pub id: String,
    pub kind: TaxonomyKind,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TaxonomyItem {
    pub fn new(kind: TaxonomyKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            name: name.into().trim().to_string(),
            description: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A department (subject area), linked to the grades that teach it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub grade_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Department {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into().trim().to_string(),
            description: None,
            is_active: true,
            grade_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_grades(mut self, grade_ids: Vec<String>) -> Self {
        self.grade_ids = grade_ids;
        self
    }
}

/// Scoping triple for a question; `None` means unscoped on that axis
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionContext {
    pub grade_id: Option<String>,
    pub semester_id: Option<String>,
    pub department_id: Option<String>,
}

impl QuestionContext {
    pub fn new(
        grade_id: impl Into<String>,
        semester_id: impl Into<String>,
        department_id: impl Into<String>,
    ) -> Self {
        Self {
            grade_id: Some(grade_id.into()),
            semester_id: Some(semester_id.into()),
            department_id: Some(department_id.into()),
        }
    }

    pub fn unscoped() -> Self {
        Self::default()
    }

    /// Build from optional parts, treating blank strings as absent
    pub fn from_parts(
        grade_id: Option<String>,
        semester_id: Option<String>,
        department_id: Option<String>,
    ) -> Self {
        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            grade_id: clean(grade_id),
            semester_id: clean(semester_id),
            department_id: clean(department_id),
        }
    }

    /// The full triple, when every part is present
    pub fn full_scope(&self) -> Option<(&str, &str, &str)> {
        match (&self.grade_id, &self.semester_id, &self.department_id) {
            (Some(g), Some(s), Some(d)) => Some((g.as_str(), s.as_str(), d.as_str())),
            _ => None,
        }
    }

    pub fn is_fully_scoped(&self) -> bool {
        self.full_scope().is_some()
    }
}

/// Display names resolved for a [`QuestionContext`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLabels {
    pub grade: Option<String>,
    pub semester: Option<String>,
    pub department: Option<String>,
}

impl ContextLabels {
    pub fn grade_or_unspecified(&self) -> &str {
        self.grade.as_deref().unwrap_or(UNSPECIFIED_LABEL)
    }

    pub fn semester_or_unspecified(&self) -> &str {
        self.semester.as_deref().unwrap_or(UNSPECIFIED_LABEL)
    }

    pub fn department_or_unspecified(&self) -> &str {
        self.department.as_deref().unwrap_or(UNSPECIFIED_LABEL)
    }
}
