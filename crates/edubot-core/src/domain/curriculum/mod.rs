//! Curriculum domain: uploaded documents, prompt grounding and the
//! grounding verifier

mod entity;
pub mod grounding;
mod repository;
mod verifier;

pub use entity::{CurriculumDocument, DocumentFilter, DocumentStatus};
pub use repository::{CurriculumStore, LIST_LIMIT};
pub use verifier::{
    GroundingEvidence, GroundingVerifier, LENGTH_FALLBACK_CHARS, REJECTION_PHRASES, Verification,
    VerificationReason, assess, candidate_phrases, contains_rejection,
};
