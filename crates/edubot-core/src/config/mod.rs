//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::domain::resolution::AnswerMode;

/// Placeholder shipped in sample `.env` files; treated as "no key"
const API_KEY_PLACEHOLDER: &str = "your-gemini-api-key-here";

/// Edubot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub retry: RetryConfig,
    pub curriculum: CurriculumConfig,
    pub answers: AnswersConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub request_timeout_secs: u64,
}

/// Backoff settings for the generative fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    pub max_jitter_ms: u64,
    pub total_timeout_secs: u64,
}

/// Caps on how much curriculum text is forwarded into a prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurriculumConfig {
    pub max_documents: usize,
    pub max_document_chars: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswersConfig {
    pub mode: AnswerMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
    pub upload_dir: Option<PathBuf>,
    pub curriculum_dir: Option<PathBuf>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.4,
            max_output_tokens: 4096,
            request_timeout_secs: 45,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            multiplier: 1.5,
            max_delay_ms: 5000,
            max_jitter_ms: 500,
            total_timeout_secs: 60,
        }
    }
}

impl Default for CurriculumConfig {
    fn default() -> Self {
        Self {
            max_documents: 3,
            max_document_chars: 100_000,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the environment
    ///
    /// Returns `None` when no key is set or the sample placeholder is still in place.
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("EDUBOT_API_KEY")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty() && key != API_KEY_PLACEHOLDER))
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| {
            opt.map(|key| {
                let chars: Vec<char> = key.chars().collect();
                if chars.len() <= 4 {
                    "***".to_string()
                } else {
                    let suffix: String = chars[chars.len() - 4..].iter().collect();
                    format!("***{}", suffix)
                }
            })
        })
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("EDUBOT_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("edubot")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or fall back to defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;

        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be at least 1"));
        }
        if self.retry.multiplier < 1.0 {
            return Err(anyhow!("retry.multiplier must be at least 1.0"));
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(anyhow!("retry.initial_delay_ms cannot exceed retry.max_delay_ms"));
        }
        if self.curriculum.max_documents == 0 {
            return Err(anyhow!("curriculum.max_documents must be at least 1"));
        }
        // learners' file requests must never resolve to stored curriculum files
        if let (Some(uploads), Some(curriculum)) =
            (&self.storage.upload_dir, &self.storage.curriculum_dir)
        {
            if uploads == curriculum {
                return Err(anyhow!(
                    "storage.curriculum_dir must differ from storage.upload_dir"
                ));
            }
        }
        Ok(())
    }

    /// Database file location, defaulting next to the config file
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("edubot.db")),
        }
    }

    /// Directory learners' files are uploaded into
    pub fn upload_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.storage.upload_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("uploads")),
        }
    }

    /// Directory curriculum documents are stored in, apart from learners' files
    pub fn curriculum_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.storage.curriculum_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("curriculum")),
        }
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "llm.model" => Ok(self.llm.model.clone()),
            "llm.base_url" => Ok(self.llm.base_url.clone()),
            "llm.temperature" => Ok(self.llm.temperature.to_string()),
            "llm.max_output_tokens" => Ok(self.llm.max_output_tokens.to_string()),
            "llm.request_timeout_secs" => Ok(self.llm.request_timeout_secs.to_string()),

            "retry.max_attempts" => Ok(self.retry.max_attempts.to_string()),
            "retry.initial_delay_ms" => Ok(self.retry.initial_delay_ms.to_string()),
            "retry.multiplier" => Ok(self.retry.multiplier.to_string()),
            "retry.max_delay_ms" => Ok(self.retry.max_delay_ms.to_string()),
            "retry.max_jitter_ms" => Ok(self.retry.max_jitter_ms.to_string()),
            "retry.total_timeout_secs" => Ok(self.retry.total_timeout_secs.to_string()),

            "curriculum.max_documents" => Ok(self.curriculum.max_documents.to_string()),
            "curriculum.max_document_chars" => Ok(self.curriculum.max_document_chars.to_string()),

            "answers.mode" => Ok(self.answers.mode.as_str().to_string()),

            "storage.database_path" => Ok(self.database_path()?.display().to_string()),
            "storage.upload_dir" => Ok(self.upload_dir()?.display().to_string()),
            "storage.curriculum_dir" => Ok(self.curriculum_dir()?.display().to_string()),

            "llm.api_key" | "api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok("(not set - use EDUBOT_API_KEY or GEMINI_API_KEY env var)".to_string()),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `edubot config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "llm.model" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("Model name cannot be empty"));
                }
                self.llm.model = value.trim().to_string();
            }
            "llm.base_url" => {
                self.llm.base_url = value.trim_end_matches('/').to_string();
            }
            "llm.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.llm.temperature = temp;
            }
            "llm.max_output_tokens" => {
                self.llm.max_output_tokens = value
                    .parse()
                    .with_context(|| format!("Invalid max_output_tokens value: {}", value))?;
            }
            "llm.request_timeout_secs" => {
                self.llm.request_timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid request_timeout_secs value: {}", value))?;
            }

            "retry.max_attempts" => {
                let attempts: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid max_attempts value: {}", value))?;
                if attempts == 0 {
                    return Err(anyhow!("max_attempts must be at least 1"));
                }
                self.retry.max_attempts = attempts;
            }
            "retry.initial_delay_ms" => {
                self.retry.initial_delay_ms = value
                    .parse()
                    .with_context(|| format!("Invalid initial_delay_ms value: {}", value))?;
            }
            "retry.multiplier" => {
                let multiplier: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid multiplier value: {}", value))?;
                if multiplier < 1.0 {
                    return Err(anyhow!("Multiplier must be at least 1.0"));
                }
                self.retry.multiplier = multiplier;
            }
            "retry.max_delay_ms" => {
                self.retry.max_delay_ms = value
                    .parse()
                    .with_context(|| format!("Invalid max_delay_ms value: {}", value))?;
            }
            "retry.max_jitter_ms" => {
                self.retry.max_jitter_ms = value
                    .parse()
                    .with_context(|| format!("Invalid max_jitter_ms value: {}", value))?;
            }
            "retry.total_timeout_secs" => {
                self.retry.total_timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid total_timeout_secs value: {}", value))?;
            }

            "curriculum.max_documents" => {
                let max: usize = value
                    .parse()
                    .with_context(|| format!("Invalid max_documents value: {}", value))?;
                if max == 0 {
                    return Err(anyhow!("max_documents must be at least 1"));
                }
                self.curriculum.max_documents = max;
            }
            "curriculum.max_document_chars" => {
                self.curriculum.max_document_chars = value
                    .parse()
                    .with_context(|| format!("Invalid max_document_chars value: {}", value))?;
            }

            "answers.mode" => {
                self.answers.mode = AnswerMode::parse(value).ok_or_else(|| {
                    anyhow!(
                        "Invalid answer mode: {}. Valid options: direct, confirm_unverified",
                        value
                    )
                })?;
            }

            "storage.database_path" => {
                self.storage.database_path = Some(PathBuf::from(value));
            }
            "storage.upload_dir" => {
                self.storage.upload_dir = Some(PathBuf::from(value));
            }
            "storage.curriculum_dir" => {
                self.storage.curriculum_dir = Some(PathBuf::from(value));
            }

            "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the EDUBOT_API_KEY or GEMINI_API_KEY environment variable instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `edubot config list` to see available keys.",
                    key
                ));
            }
        }
        self.validate()
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "llm.model",
            "llm.base_url",
            "llm.temperature",
            "llm.max_output_tokens",
            "llm.request_timeout_secs",
            "llm.api_key",
            "retry.max_attempts",
            "retry.initial_delay_ms",
            "retry.multiplier",
            "retry.max_delay_ms",
            "retry.max_jitter_ms",
            "retry.total_timeout_secs",
            "curriculum.max_documents",
            "curriculum.max_document_chars",
            "answers.mode",
            "storage.database_path",
            "storage.upload_dir",
            "storage.curriculum_dir",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}
