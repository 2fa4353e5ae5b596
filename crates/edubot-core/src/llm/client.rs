//! Gemini client implementation
//!
//! Provides the `GenerativeModel` seam the resolution pipeline talks to,
//! a reqwest-backed Gemini client, and a disabled stand-in used when no
//! API key is configured.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client as HttpClient;
use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::types::{GenerateContentRequest, GenerateContentResponse};

/// Message carried by every failure of the disabled model
pub const DISABLED_MESSAGE: &str = "generative model is not configured";

/// Binary attachment (image or audio) sent with a prompt
#[derive(Clone, PartialEq, Eq)]
pub struct MediaInput {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaInput {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

impl std::fmt::Debug for MediaInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaInput")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// A text-in, text-out generative model
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate a completion for a prompt plus one attachment
    async fn generate_with_media(&self, _prompt: &str, media: &MediaInput) -> Result<String> {
        Err(Error::GenerativeFatal(format!(
            "{} input is not supported by this model",
            media.mime_type
        )))
    }

    /// Model identifier, for logs and `doctor`
    fn model_name(&self) -> &str;

    /// Whether calls can succeed at all
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Gemini REST client
#[derive(Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    config: LlmConfig,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

/// Builder for creating a GeminiClient
#[derive(Default)]
pub struct GeminiClientBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl GeminiClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the API base URL (defaults to the configured one)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<GeminiClient> {
        let config = self.config.unwrap_or_default();
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::ConfigError("API key is required".to_string()))?;

        let timeout_secs = self.timeout_secs.unwrap_or(config.request_timeout_secs);

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| config.base_url.clone())
            .trim_end_matches('/')
            .to_string();

        Ok(GeminiClient {
            http_client,
            config,
            api_key,
            base_url,
        })
    }
}

impl GeminiClient {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        GeminiClientBuilder::new().config(config).api_key(api_key).build()
    }

    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.config.model)
    }

    /// Send a single request; no retry happens at this level
    async fn send_request(&self, request: &GenerateContentRequest) -> Result<String> {
        debug!(model = %self.config.model, "Sending generateContent request");

        let response = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            return handle_error_response(status, response).await;
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::LlmError(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = &body.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini usage"
            );
        }

        match body.first_text() {
            Some(text) => {
                info!(model = %self.config.model, chars = text.chars().count(), "Gemini answered");
                Ok(text)
            }
            None => match body.block_reason() {
                Some(reason) => Err(Error::GenerativeFatal(format!(
                    "Prompt blocked by the model: {}",
                    reason
                ))),
                None => Err(Error::GenerativeFatal("Empty response from model".to_string())),
            },
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest::prompt(prompt)
            .with_temperature(self.config.temperature)
            .with_max_output_tokens(self.config.max_output_tokens);
        self.send_request(&request).await
    }

    async fn generate_with_media(&self, prompt: &str, media: &MediaInput) -> Result<String> {
        debug!(mime_type = %media.mime_type, bytes = media.bytes.len(), "Attaching media");
        let request = GenerateContentRequest::prompt_with_inline(
            prompt,
            media.mime_type.as_str(),
            BASE64.encode(&media.bytes),
        )
        .with_temperature(self.config.temperature)
        .with_max_output_tokens(self.config.max_output_tokens);
        self.send_request(&request).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Map a non-success HTTP response to an error whose text keeps the status
/// code, so transient failures stay recognisable downstream
async fn handle_error_response<T>(
    status: reqwest::StatusCode,
    response: reqwest::Response,
) -> Result<T> {
    let body = response.text().await.unwrap_or_default();

    match status.as_u16() {
        400 => Err(Error::LlmError(format!("Bad request: {}", body))),
        401 | 403 => Err(Error::LlmError(
            "Unauthorized: invalid API key. Set EDUBOT_API_KEY or GEMINI_API_KEY.".to_string(),
        )),
        404 => Err(Error::LlmError(format!("Model not found: {}", body))),
        429 => Err(Error::LlmError(format!(
            "Rate limited ({}): model overloaded: {}",
            status, body
        ))),
        500..=599 => Err(Error::LlmError(format!("Server error ({}): {}", status, body))),
        _ => Err(Error::LlmError(format!("HTTP error {}: {}", status, body))),
    }
}

/// Stand-in used when no API key is configured
#[derive(Debug, Clone, Default)]
pub struct DisabledModel;

#[async_trait]
impl GenerativeModel for DisabledModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::GenerativeFatal(DISABLED_MESSAGE.to_string()))
    }

    fn model_name(&self) -> &str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Build the model described by configuration and environment
pub fn model_from_config(config: &LlmConfig) -> Result<Arc<dyn GenerativeModel>> {
    let api_key = config
        .resolved_api_key()
        .map_err(|e| Error::ConfigError(e.to_string()))?;

    match api_key {
        Some(key) => Ok(Arc::new(GeminiClient::new(config.clone(), key)?)),
        None => {
            info!("No API key configured, generative fallback disabled");
            Ok(Arc::new(DisabledModel))
        }
    }
}
