//! Answering learners' questions
//!
//! [`AnswerService`] wires the database and configuration into an
//! [`AnswerPipeline`] and records every answer in the conversation log.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::domain::conversation::{ConversationRecord, ConversationRepository};
use crate::domain::resolution::{AnswerPipeline, Resolution, ResolveRequest};
use crate::error::{Error, Result};
use crate::extraction::{GenerativeExtractor, UploadArea};
use crate::infrastructure::conversation::SqliteConversationRepository;
use crate::infrastructure::curriculum::SqliteCurriculumStore;
use crate::infrastructure::knowledge::SqliteKnowledgeStore;
use crate::infrastructure::taxonomy::SqliteTaxonomyRepository;
use crate::llm::{GenerativeFallbackClient, GenerativeModel, RetryPolicy, model_from_config};
use crate::storage::Database;

/// Pipeline plus conversation log
#[derive(Clone)]
pub struct AnswerService {
    pipeline: AnswerPipeline,
    conversations: Arc<dyn ConversationRepository>,
    model: Arc<dyn GenerativeModel>,
}

impl AnswerService {
    /// Build from configuration, picking the model from the environment
    pub fn new(db: &Database, config: &Config) -> Result<Self> {
        let model = model_from_config(&config.llm)?;
        Self::with_model(db, config, model)
    }

    /// Build with an explicit generative model
    pub fn with_model(
        db: &Database,
        config: &Config,
        model: Arc<dyn GenerativeModel>,
    ) -> Result<Self> {
        let pool = db.pool().clone();
        let client = GenerativeFallbackClient::new(model.clone(), RetryPolicy::from(&config.retry));
        let upload_dir = config
            .upload_dir()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        let uploads = UploadArea::open(upload_dir)?;
        let curriculum_root = config
            .curriculum_dir()
            .ok()
            .and_then(|dir| dir.canonicalize().ok());
        if curriculum_root.as_deref() == Some(uploads.root()) {
            return Err(Error::ConfigError(
                "the upload directory must not be the curriculum directory".to_string(),
            ));
        }

        let pipeline = AnswerPipeline::new(
            Arc::new(SqliteKnowledgeStore::new(pool.clone())),
            Arc::new(SqliteCurriculumStore::new(pool.clone())),
            Arc::new(SqliteTaxonomyRepository::new(pool.clone())),
            client.clone(),
        )
        .with_extractor(Arc::new(GenerativeExtractor::new(client)))
        .with_uploads(uploads)
        .with_mode(config.answers.mode)
        .with_limits(config.curriculum.clone());

        Ok(Self {
            pipeline,
            conversations: Arc::new(SqliteConversationRepository::new(pool)),
            model,
        })
    }

    pub fn model(&self) -> &Arc<dyn GenerativeModel> {
        &self.model
    }

    pub fn pipeline(&self) -> &AnswerPipeline {
        &self.pipeline
    }

    /// Validate, resolve and record one request
    ///
    /// Only validation fails; a conversation that cannot be recorded is
    /// logged and the answer is still returned.
    pub async fn ask(&self, request: ResolveRequest) -> Result<Resolution> {
        let request = request.validate()?;
        let resolution = self.pipeline.resolve(&request).await;

        let question = match (&request.file, request.question.is_empty()) {
            (Some(file), true) => format!("[{}]", file),
            (Some(file), false) => format!("[{}] {}", file, request.question),
            (None, true) => request
                .pending
                .as_ref()
                .map(|p| p.confirmation.clone())
                .unwrap_or_default(),
            (None, false) => request.question.clone(),
        };
        let record = ConversationRecord::new(
            &request.username,
            question,
            &resolution.answer,
            resolution.provenance,
        )
        .with_context(request.context.clone())
        .with_session(request.session_id.clone());

        if let Err(e) = self.conversations.record(&record).await {
            warn!(error = %e, "Could not record conversation");
        }

        info!(
            username = %request.username,
            provenance = resolution.provenance.as_str(),
            "Question answered"
        );
        Ok(resolution)
    }
}
