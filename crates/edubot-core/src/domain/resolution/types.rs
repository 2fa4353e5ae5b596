//! Request and result types of the answer resolution pipeline

use serde::{Deserialize, Serialize};

use crate::domain::curriculum::Verification;
use crate::domain::knowledge::MatchKind;
use crate::domain::taxonomy::QuestionContext;
use crate::error::{Error, Result};

/// Which stage produced the final answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    KnowledgeBase,
    Generative,
    GenerativeUnverified,
    Deflection,
    Error,
    Cancelled,
    AwaitingConfirmation,
    Extraction,
}

impl Provenance {
    pub const ALL: [Provenance; 8] = [
        Self::KnowledgeBase,
        Self::Generative,
        Self::GenerativeUnverified,
        Self::Deflection,
        Self::Error,
        Self::Cancelled,
        Self::AwaitingConfirmation,
        Self::Extraction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KnowledgeBase => "knowledge_base",
            Self::Generative => "generative",
            Self::GenerativeUnverified => "generative_unverified",
            Self::Deflection => "deflection",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Extraction => "extraction",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How unverified generative answers are delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    /// Deliver every generative answer immediately
    #[default]
    Direct,
    /// Hold back unverified answers until the learner confirms
    ConfirmUnverified,
}

impl AnswerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::ConfirmUnverified => "confirm_unverified",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "direct" => Some(Self::Direct),
            "confirm_unverified" => Some(Self::ConfirmUnverified),
            _ => None,
        }
    }
}

/// A previously held-back answer and the learner's reply to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub answer: String,
    pub confirmation: String,
}

/// One learner request, validated once before the pipeline runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub username: String,
    pub question: String,
    pub context: QuestionContext,
    /// Name of a file in the upload area
    pub file: Option<String>,
    pub pending: Option<PendingConfirmation>,
    pub session_id: Option<String>,
}

impl ResolveRequest {
    pub fn new(username: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: QuestionContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_pending(
        mut self,
        answer: impl Into<String>,
        confirmation: impl Into<String>,
    ) -> Self {
        self.pending = Some(PendingConfirmation {
            answer: answer.into(),
            confirmation: confirmation.into(),
        });
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Trim fields and check the required ones
    pub fn validate(mut self) -> Result<Self> {
        self.username = self.username.trim().to_string();
        self.question = self.question.trim().to_string();
        self.file = self
            .file
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        self.pending = self
            .pending
            .filter(|p| !p.answer.trim().is_empty() && !p.confirmation.trim().is_empty());

        if self.username.is_empty() {
            return Err(Error::InvalidInput("username is required".to_string()));
        }
        if self.question.is_empty() && self.file.is_none() && self.pending.is_none() {
            return Err(Error::InvalidInput(
                "a question or a file is required".to_string(),
            ));
        }
        Ok(self)
    }
}

/// The pipeline's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub answer: String,
    pub provenance: Provenance,
    /// Generative text held back in `ConfirmUnverified` mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_kind: Option<MatchKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
}

impl Resolution {
    pub fn new(answer: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            answer: answer.into(),
            provenance,
            pending_answer: None,
            match_kind: None,
            verification: None,
        }
    }

    pub fn with_match_kind(mut self, kind: MatchKind) -> Self {
        self.match_kind = Some(kind);
        self
    }

    pub fn with_verification(mut self, verification: Verification) -> Self {
        self.verification = Some(verification);
        self
    }

    pub fn with_pending_answer(mut self, answer: impl Into<String>) -> Self {
        self.pending_answer = Some(answer.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_round_trip() {
        for provenance in Provenance::ALL {
            assert_eq!(Provenance::parse(provenance.as_str()), Some(provenance));
        }
        assert_eq!(Provenance::parse("book"), None);
    }

    #[test]
    fn test_answer_mode_parse() {
        assert_eq!(AnswerMode::parse("direct"), Some(AnswerMode::Direct));
        assert_eq!(
            AnswerMode::parse(" confirm_unverified "),
            Some(AnswerMode::ConfirmUnverified)
        );
        assert_eq!(AnswerMode::parse("ask"), None);
        assert_eq!(AnswerMode::default(), AnswerMode::Direct);
    }

    #[test]
    fn test_validate_requires_username() {
        let result = ResolveRequest::new("  ", "سؤال").validate();
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_validate_requires_question_or_file() {
        assert!(ResolveRequest::new("sara", " ").validate().is_err());
        assert!(ResolveRequest::new("sara", "").with_file("scan.png").validate().is_ok());
        assert!(
            ResolveRequest::new("sara", "")
                .with_pending("held answer", "نعم")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_validate_trims_and_drops_half_pending() {
        let request = ResolveRequest::new(" sara ", " ما هي الخلية؟ ")
            .with_file("  ")
            .with_pending("held", "   ")
            .validate()
            .unwrap();
        assert_eq!(request.username, "sara");
        assert_eq!(request.question, "ما هي الخلية؟");
        assert!(request.file.is_none());
        assert!(request.pending.is_none());
    }

    #[test]
    fn test_resolution_serialization_skips_empty_fields() {
        let json = serde_json::to_value(Resolution::new("x", Provenance::Deflection)).unwrap();
        assert_eq!(json["provenance"], "deflection");
        assert!(json.get("pending_answer").is_none());
    }
}
