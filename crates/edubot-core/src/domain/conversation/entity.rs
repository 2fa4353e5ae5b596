//! Conversation log entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::resolution::Provenance;
use crate::domain::taxonomy::QuestionContext;

/// One answered request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub username: String,
    pub question: String,
    pub answer: String,
    pub context: QuestionContext,
    pub provenance: Provenance,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(
        username: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
        provenance: Provenance,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            question: question.into(),
            answer: answer.into(),
            context: QuestionContext::default(),
            provenance,
            session_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_context(mut self, context: QuestionContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}

/// A logged conversation with its context names resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: ConversationRecord,
    pub grade_name: Option<String>,
    pub semester_name: Option<String>,
    pub department_name: Option<String>,
}

/// Aggregate counts over the conversation log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub total: u64,
    pub unique_users: u64,
    /// Conversations since midnight UTC
    pub today: u64,
    pub by_provenance: Vec<(Provenance, u64)>,
}

impl ConversationStats {
    pub fn count_for(&self, provenance: Provenance) -> u64 {
        self.by_provenance
            .iter()
            .find(|(p, _)| *p == provenance)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}
