//! Domain layer
//!
//! Entities, repository traits and the decision logic of the answer
//! pipeline. Storage lives in `crate::infrastructure`.

pub mod conversation;
pub mod curriculum;
pub mod knowledge;
pub mod resolution;
pub mod taxonomy;
