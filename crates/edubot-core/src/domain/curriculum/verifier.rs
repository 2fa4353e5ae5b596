//! Curriculum grounding check for generative answers
//!
//! A textual heuristic, not a proof: an answer counts as grounded when
//! enough of its 4-6 word phrases appear verbatim in one curriculum
//! document, or when it is long enough to be presumed detailed. The
//! outcome only labels provenance; it never suppresses an answer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::taxonomy::QuestionContext;

use super::repository::CurriculumStore;

/// Phrases that mark an answer as a refusal
pub const REJECTION_PHRASES: [&str; 16] = [
    "غير موجود",
    "ليس في المنهج",
    "خارج نطاق",
    "غير مقرر",
    "ليس مقرر",
    "غير متوفر",
    "لا أستطيع",
    "عذراً",
    "لا يمكنني",
    "not found",
    "not in the curriculum",
    "outside the scope",
    "cannot",
    "can't",
    "sorry",
    "unable to",
];

const SENTENCE_TERMINATORS: [char; 4] = ['.', '!', '?', '。'];
const MIN_SENTENCE_WORDS: usize = 4;
const MAX_PHRASE_WORDS: usize = 6;
const MIN_PHRASE_CHARS: usize = 15;
const MIN_PHRASE_MATCHES: usize = 2;
const MIN_MATCH_RATIO: f64 = 0.15;
/// Answers longer than this are presumed grounded when overlap fails
pub const LENGTH_FALLBACK_CHARS: usize = 800;

/// Phrase overlap between an answer and one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingEvidence {
    pub matches: usize,
    pub total_phrases: usize,
}

impl GroundingEvidence {
    pub fn ratio(&self) -> f64 {
        if self.total_phrases == 0 {
            0.0
        } else {
            self.matches as f64 / self.total_phrases as f64
        }
    }

    fn is_sufficient(&self) -> bool {
        self.total_phrases > 0
            && (self.matches >= MIN_PHRASE_MATCHES || self.ratio() >= MIN_MATCH_RATIO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationReason {
    EmptyAnswer,
    NoDocuments,
    RejectionPhrase,
    PhraseOverlap,
    LengthFallback,
    InsufficientOverlap,
    StoreUnavailable,
}

/// Result of checking one answer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub grounded: bool,
    pub reason: VerificationReason,
    /// Best per-document evidence seen
    pub evidence: GroundingEvidence,
}

impl Verification {
    fn rejected(reason: VerificationReason) -> Self {
        Self {
            grounded: false,
            reason,
            evidence: GroundingEvidence::default(),
        }
    }
}

/// Whether the lowercased answer contains a refusal phrase
pub fn contains_rejection(normalized_answer: &str) -> bool {
    REJECTION_PHRASES
        .iter()
        .any(|phrase| normalized_answer.contains(phrase))
}

/// Overlapping word windows taken from every sentence of 4+ words
pub fn candidate_phrases(normalized_answer: &str) -> Vec<String> {
    let mut phrases = Vec::new();

    for sentence in normalized_answer.split(SENTENCE_TERMINATORS) {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        if words.len() < MIN_SENTENCE_WORDS {
            continue;
        }
        for start in 0..=(words.len() - MIN_SENTENCE_WORDS) {
            let end = start + MAX_PHRASE_WORDS.min(words.len() - start);
            let phrase = words[start..end].join(" ");
            if phrase.chars().count() > MIN_PHRASE_CHARS {
                phrases.push(phrase);
            }
        }
    }

    phrases
}

/// Check an answer against already-fetched curriculum documents
pub fn assess(answer: &str, documents: &[String]) -> Verification {
    let normalized = answer.trim().to_lowercase();
    if normalized.is_empty() {
        return Verification::rejected(VerificationReason::EmptyAnswer);
    }
    if documents.is_empty() {
        return Verification::rejected(VerificationReason::NoDocuments);
    }
    if contains_rejection(&normalized) {
        return Verification::rejected(VerificationReason::RejectionPhrase);
    }

    let phrases = candidate_phrases(&normalized);
    let mut best = GroundingEvidence {
        matches: 0,
        total_phrases: phrases.len(),
    };

    for document in documents {
        let text = document.trim().to_lowercase();
        if text.is_empty() {
            continue;
        }

        let evidence = GroundingEvidence {
            matches: phrases.iter().filter(|p| text.contains(p.as_str())).count(),
            total_phrases: phrases.len(),
        };
        if evidence.is_sufficient() {
            return Verification {
                grounded: true,
                reason: VerificationReason::PhraseOverlap,
                evidence,
            };
        }
        if evidence.matches > best.matches {
            best = evidence;
        }
    }

    if answer.chars().count() > LENGTH_FALLBACK_CHARS {
        return Verification {
            grounded: true,
            reason: VerificationReason::LengthFallback,
            evidence: best,
        };
    }

    Verification {
        grounded: false,
        reason: VerificationReason::InsufficientOverlap,
        evidence: best,
    }
}

/// Checks generative answers against the curriculum uploaded for a context
#[derive(Clone)]
pub struct GroundingVerifier {
    store: Arc<dyn CurriculumStore>,
}

impl GroundingVerifier {
    pub fn new(store: Arc<dyn CurriculumStore>) -> Self {
        Self { store }
    }

    /// Full outcome; store failures degrade to "not grounded"
    pub async fn check(&self, answer: &str, context: &QuestionContext) -> Verification {
        let documents = match self.store.fetch_active_documents(context).await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(error = %e, "Could not load curriculum for verification");
                return Verification::rejected(VerificationReason::StoreUnavailable);
            }
        };

        let verification = assess(answer, &documents);
        if verification.grounded {
            info!(
                reason = ?verification.reason,
                matches = verification.evidence.matches,
                total_phrases = verification.evidence.total_phrases,
                "Answer verified against curriculum"
            );
        } else {
            debug!(
                reason = ?verification.reason,
                documents = documents.len(),
                matches = verification.evidence.matches,
                total_phrases = verification.evidence.total_phrases,
                "Answer not verified against curriculum"
            );
        }
        verification
    }

    pub async fn verify(&self, answer: &str, context: &QuestionContext) -> bool {
        self.check(answer, context).await.grounded
    }
}
