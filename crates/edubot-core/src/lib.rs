//! Edubot Core Library
//!
//! Curriculum-grounded question answering for learners:
//! - Answer resolution pipeline (knowledge base, generative fallback, deflection)
//! - Curriculum grounding verifier
//! - Generative model client with bounded retry (Gemini API)
//! - Content extraction for uploaded documents, images and audio
//! - Storage (SQLite) and administrative commands

pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod extraction;
pub mod infrastructure;
pub mod llm;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::ask::AnswerService;
    pub use crate::config::Config;
    pub use crate::domain::resolution::{AnswerMode, Provenance, Resolution, ResolveRequest};
    pub use crate::domain::taxonomy::QuestionContext;
    pub use crate::error::{Error, Result};
    pub use crate::storage::Database;
}
