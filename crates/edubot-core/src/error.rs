//! Error types for Edubot

use thiserror::Error;

/// Result type alias using Edubot's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Edubot error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("Grade '{0}' not found. Run `edubot grades list` to see all grades.")]
    GradeNotFound(String),

    #[error("Semester '{0}' not found. Run `edubot semesters list` to see all semesters.")]
    SemesterNotFound(String),

    #[error("Department '{0}' not found. Run `edubot departments list` to see all departments.")]
    DepartmentNotFound(String),

    #[error("Curriculum document '{0}' not found or already removed.")]
    DocumentNotFound(String),

    #[error("Knowledge entry '{0}' not found.")]
    KnowledgeEntryNotFound(String),

    #[error("File '{0}' not found in the upload area.")]
    FileNotFound(String),

    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("Generative model error: {0}")]
    LlmError(String),

    #[error("Generative model still failing after {attempts} attempts: {message}")]
    GenerativeTransient { attempts: u32, message: String },

    #[error("Generative model failed: {0}")]
    GenerativeFatal(String),

    #[error("Generative model did not answer within {0} seconds")]
    GenerativeTimeout(u64),

    // Extraction errors (E200-E299)
    #[error("Unsupported file type: {0}")]
    ExtractionUnsupported(String),

    #[error("Could not extract text: {0}")]
    ExtractionFailed(String),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("A record named '{0}' already exists. Choose another name.")]
    DuplicateName(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::GradeNotFound(_) => "E001",
            Self::SemesterNotFound(_) => "E002",
            Self::DepartmentNotFound(_) => "E003",
            Self::DocumentNotFound(_) => "E004",
            Self::KnowledgeEntryNotFound(_) => "E005",
            Self::FileNotFound(_) => "E006",
            Self::NetworkError(_) => "E100",
            Self::LlmError(_) => "E101",
            Self::GenerativeTransient { .. } => "E102",
            Self::GenerativeFatal(_) => "E103",
            Self::GenerativeTimeout(_) => "E104",
            Self::ExtractionUnsupported(_) => "E200",
            Self::ExtractionFailed(_) => "E201",
            Self::DatabaseError(_) => "E400",
            Self::DuplicateName(_) => "E401",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::GradeNotFound(_) => Some("edubot grades list".to_string()),
            Self::SemesterNotFound(_) => Some("edubot semesters list".to_string()),
            Self::DepartmentNotFound(_) => Some("edubot departments list".to_string()),
            Self::DocumentNotFound(_) => Some("edubot curriculum list".to_string()),
            Self::KnowledgeEntryNotFound(_) => Some("edubot kb list".to_string()),
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::GenerativeFatal(_) | Self::LlmError(_) => {
                Some("Set EDUBOT_API_KEY or GEMINI_API_KEY, then run `edubot doctor`".to_string())
            }
            Self::ConfigError(_) => Some("edubot config list".to_string()),
            _ => None,
        }
    }

    /// Whether this error came out of the generative stage
    pub fn is_generative(&self) -> bool {
        matches!(
            self,
            Self::GenerativeTransient { .. }
                | Self::GenerativeFatal(_)
                | Self::GenerativeTimeout(_)
                | Self::LlmError(_)
        )
    }
}
