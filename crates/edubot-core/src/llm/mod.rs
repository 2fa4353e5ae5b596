//! Generative model integration - Gemini API
//!
//! - `GenerativeModel`: the seam the pipeline calls
//! - `GeminiClient` / `DisabledModel`: concrete models
//! - `GenerativeFallbackClient`: bounded retry with backoff and a deadline

mod client;
mod retry;
mod types;

pub use client::{
    DISABLED_MESSAGE, DisabledModel, GeminiClient, GeminiClientBuilder, GenerativeModel,
    MediaInput, model_from_config,
};
pub use retry::{FailureClass, GenerativeFallbackClient, RetryPolicy, classify_failure};
pub use types::{Content, GenerateContentRequest, GenerateContentResponse, InlineData, Part};
