//! Curated question/answer entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::taxonomy::QuestionContext;

/// A curated question with its reference answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub question: String,
    pub answer: String,
    /// Free-form search terms, matched as one string
    pub keywords: String,
    pub grade_id: Option<String>,
    pub semester_id: Option<String>,
    pub department_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.into(),
            answer: answer.into(),
            keywords: String::new(),
            grade_id: None,
            semester_id: None,
            department_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = keywords.into();
        self
    }

    /// Scope the entry to a context (absent parts stay unscoped)
    pub fn with_context(mut self, context: &QuestionContext) -> Self {
        self.grade_id = context.grade_id.clone();
        self.semester_id = context.semester_id.clone();
        self.department_id = context.department_id.clone();
        self
    }
}

/// Which rows a knowledge query considers
///
/// A `None` part selects entries where that column is unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeScope {
    /// Same grade, semester and department
    Full {
        grade_id: Option<String>,
        semester_id: Option<String>,
        department_id: Option<String>,
    },
    /// Same grade and semester, any department
    GradeSemester {
        grade_id: Option<String>,
        semester_id: Option<String>,
    },
}

impl KnowledgeScope {
    pub fn full(context: &QuestionContext) -> Self {
        Self::Full {
            grade_id: context.grade_id.clone(),
            semester_id: context.semester_id.clone(),
            department_id: context.department_id.clone(),
        }
    }

    pub fn relaxed(context: &QuestionContext) -> Self {
        Self::GradeSemester {
            grade_id: context.grade_id.clone(),
            semester_id: context.semester_id.clone(),
        }
    }
}
