//! Answer resolution: request types, prompt, fixed texts and the pipeline

pub mod messages;
mod pipeline;
mod prompt;
mod types;

pub use pipeline::AnswerPipeline;
pub use prompt::build_prompt;
pub use types::{AnswerMode, PendingConfirmation, Provenance, Resolution, ResolveRequest};
