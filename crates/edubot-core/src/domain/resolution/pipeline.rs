//! Answer resolution pipeline
//!
//! Stages run in a fixed order and the first one that produces text wins:
//!
//! - a pending answer plus the learner's confirmation short-circuits everything
//! - a file reference is handed to the content extractor, whose text is the answer
//! - the curated knowledge base
//! - the generative model, grounded on the uploaded curriculum and tagged by
//!   the grounding verifier
//! - a fixed deflection
//!
//! `resolve` never fails. Store and model errors are logged and turned into
//! one of the fixed texts in [`super::messages`].

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::CurriculumConfig;
use crate::domain::curriculum::{CurriculumStore, GroundingVerifier, grounding};
use crate::domain::knowledge::{KnowledgeMatcher, KnowledgeStore};
use crate::domain::taxonomy::{ContextLabels, QuestionContext, TaxonomyRepository};
use crate::error::Error;
use crate::extraction::{ContentExtractor, FileKind, LocalExtractor, UploadArea};
use crate::llm::GenerativeFallbackClient;

use super::messages;
use super::prompt::build_prompt;
use super::types::{AnswerMode, PendingConfirmation, Provenance, Resolution, ResolveRequest};

/// Orchestrates the knowledge base, the generative fallback and the verifier
#[derive(Clone)]
pub struct AnswerPipeline {
    matcher: KnowledgeMatcher,
    generative: GenerativeFallbackClient,
    verifier: GroundingVerifier,
    curriculum: Arc<dyn CurriculumStore>,
    taxonomy: Arc<dyn TaxonomyRepository>,
    extractor: Arc<dyn ContentExtractor>,
    uploads: Option<UploadArea>,
    mode: AnswerMode,
    limits: CurriculumConfig,
}

impl AnswerPipeline {
    pub fn new(
        knowledge: Arc<dyn KnowledgeStore>,
        curriculum: Arc<dyn CurriculumStore>,
        taxonomy: Arc<dyn TaxonomyRepository>,
        generative: GenerativeFallbackClient,
    ) -> Self {
        Self {
            matcher: KnowledgeMatcher::new(knowledge),
            generative,
            verifier: GroundingVerifier::new(curriculum.clone()),
            curriculum,
            taxonomy,
            extractor: Arc::new(LocalExtractor::new()),
            uploads: None,
            mode: AnswerMode::default(),
            limits: CurriculumConfig::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Directory file references are resolved in; without one, file requests fail
    pub fn with_uploads(mut self, uploads: UploadArea) -> Self {
        self.uploads = Some(uploads);
        self
    }

    pub fn with_mode(mut self, mode: AnswerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_limits(mut self, limits: CurriculumConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn mode(&self) -> AnswerMode {
        self.mode
    }

    /// Resolve one validated request into an answer and its provenance
    pub async fn resolve(&self, request: &ResolveRequest) -> Resolution {
        if let Some(pending) = &request.pending {
            return self.resolve_pending(pending);
        }

        if let Some(file) = &request.file {
            return self.resolve_file(file, &request.question).await;
        }

        self.resolve_question(&request.question, &request.context).await
    }

    fn resolve_pending(&self, pending: &PendingConfirmation) -> Resolution {
        if messages::is_accept_phrase(&pending.confirmation) {
            info!(provenance = Provenance::Generative.as_str(), "Pending answer accepted");
            Resolution::new(pending.answer.clone(), Provenance::Generative)
        } else {
            info!(provenance = Provenance::Cancelled.as_str(), "Pending answer declined");
            Resolution::new(messages::CANCELLED, Provenance::Cancelled)
        }
    }

    async fn resolve_file(&self, file_ref: &str, question: &str) -> Resolution {
        let Some(uploads) = &self.uploads else {
            error!(file = %file_ref, "File request without an upload area");
            return Resolution::new(messages::FILE_PROCESSING_FAILED, Provenance::Error);
        };

        let path = match uploads.resolve(file_ref) {
            Ok(path) => path,
            Err(Error::FileNotFound(name)) => {
                warn!(file = %name, "Uploaded file not found");
                return Resolution::new(messages::MISSING_FILE, Provenance::Error);
            }
            Err(e) => {
                warn!(file = %file_ref, error = %e, "Rejected file reference");
                return Resolution::new(messages::INVALID_FILE, Provenance::Error);
            }
        };

        let kind = match FileKind::classify(&path) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(file = %file_ref, error = %e, "Unsupported upload");
                return Resolution::new(messages::UNSUPPORTED_FILE, Provenance::Error);
            }
        };

        let question = Some(question).filter(|q| !q.is_empty());
        match self.extractor.extract(&path, kind, question).await {
            Ok(text) => {
                uploads.remove(&path).await;
                info!(
                    kind = kind.as_str(),
                    chars = text.chars().count(),
                    provenance = Provenance::Extraction.as_str(),
                    "Resolved file request"
                );
                Resolution::new(text, Provenance::Extraction)
            }
            Err(Error::ExtractionUnsupported(detail)) => {
                warn!(kind = kind.as_str(), detail = %detail, "Extractor cannot read this format");
                Resolution::new(messages::UNSUPPORTED_FILE, Provenance::Error)
            }
            Err(Error::ExtractionFailed(detail)) => {
                error!(kind = kind.as_str(), detail = %detail, "Extraction failed");
                Resolution::new(messages::extraction_failed(kind), Provenance::Error)
            }
            Err(e) => {
                error!(kind = kind.as_str(), error = %e, "File processing failed");
                Resolution::new(messages::FILE_PROCESSING_FAILED, Provenance::Error)
            }
        }
    }

    async fn resolve_question(&self, question: &str, context: &QuestionContext) -> Resolution {
        match self.matcher.find(question, context).await {
            Ok(Some(hit)) => {
                info!(
                    entry_id = %hit.entry_id,
                    kind = hit.kind.as_str(),
                    relaxed = hit.relaxed,
                    provenance = Provenance::KnowledgeBase.as_str(),
                    "Resolved from knowledge base"
                );
                return Resolution::new(hit.answer, Provenance::KnowledgeBase)
                    .with_match_kind(hit.kind);
            }
            Ok(None) => debug!("No knowledge base answer, asking the generative model"),
            Err(e) => warn!(error = %e, "Knowledge base unavailable, asking the generative model"),
        }

        let labels = self.labels(context).await;
        let curriculum = self.grounding_text(context).await;
        let prompt = build_prompt(question, &labels, curriculum.as_deref());

        let answer = match self.generative.ask(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(
                    code = e.code(),
                    error = %e,
                    provenance = Provenance::Deflection.as_str(),
                    "Generative fallback failed"
                );
                return Resolution::new(
                    messages::deflection(labels.department.as_deref()),
                    Provenance::Deflection,
                );
            }
        };

        let verification = self.verifier.check(&answer, context).await;
        let provenance = if verification.grounded {
            Provenance::Generative
        } else {
            Provenance::GenerativeUnverified
        };

        if provenance == Provenance::GenerativeUnverified
            && self.mode == AnswerMode::ConfirmUnverified
        {
            info!(
                provenance = Provenance::AwaitingConfirmation.as_str(),
                "Holding unverified answer for confirmation"
            );
            return Resolution::new(messages::CONFIRMATION_PROMPT, Provenance::AwaitingConfirmation)
                .with_pending_answer(answer)
                .with_verification(verification);
        }

        info!(
            provenance = provenance.as_str(),
            matches = verification.evidence.matches,
            total_phrases = verification.evidence.total_phrases,
            "Resolved from generative model"
        );
        Resolution::new(answer, provenance).with_verification(verification)
    }

    async fn labels(&self, context: &QuestionContext) -> ContextLabels {
        match self.taxonomy.context_labels(context).await {
            Ok(labels) => labels,
            Err(e) => {
                warn!(error = %e, "Could not resolve context names");
                ContextLabels::default()
            }
        }
    }

    async fn grounding_text(&self, context: &QuestionContext) -> Option<String> {
        match self.curriculum.fetch_active_documents(context).await {
            Ok(documents) => {
                let text = grounding::assemble(&documents, &self.limits);
                debug!(
                    documents = documents.len(),
                    chars = text.as_deref().map(|t| t.chars().count()).unwrap_or(0),
                    "Assembled curriculum grounding"
                );
                text
            }
            Err(e) => {
                warn!(error = %e, "Could not load curriculum for the prompt");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::curriculum::{CurriculumDocument, VerificationReason};
    use crate::domain::knowledge::{KnowledgeEntry, MatchKind};
    use crate::domain::taxonomy::{Department, TaxonomyItem, TaxonomyKind};
    use crate::error::Result;
    use crate::infrastructure::curriculum::SqliteCurriculumStore;
    use crate::infrastructure::knowledge::SqliteKnowledgeStore;
    use crate::infrastructure::taxonomy::SqliteTaxonomyRepository;
    use crate::llm::{DisabledModel, GenerativeModel, RetryPolicy};
    use crate::storage::Database;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const CURRICULUM: &str = "الخلية هي الوحدة الأساسية في بناء جميع الكائنات الحية. \
        تتكون الخلية من غشاء خلوي وسيتوبلازم ونواة تحمل المادة الوراثية.";

    /// Answers every prompt with the same result and counts calls
    struct ScriptedModel {
        reply: std::result::Result<String, String>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn answering(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(Error::LlmError)
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    /// Extractor double with a fixed outcome
    struct FixedExtractor(fn() -> Result<String>);

    #[async_trait]
    impl ContentExtractor for FixedExtractor {
        async fn extract(
            &self,
            _path: &Path,
            _kind: FileKind,
            _question: Option<&str>,
        ) -> Result<String> {
            (self.0)()
        }
    }

    struct Fixture {
        db: Database,
        context: QuestionContext,
    }

    async fn fixture() -> Fixture {
        let db = Database::in_memory().await.unwrap();
        let taxonomy = SqliteTaxonomyRepository::new(db.pool().clone());

        let grade = TaxonomyItem::new(TaxonomyKind::Grade, "الصف التجريبي");
        let semester = TaxonomyItem::new(TaxonomyKind::Semester, "الفصل التجريبي");
        let department = Department::new("الأحياء").with_grades(vec![grade.id.clone()]);
        taxonomy.add_item(&grade).await.unwrap();
        taxonomy.add_item(&semester).await.unwrap();
        taxonomy.add_department(&department).await.unwrap();

        let context = QuestionContext::new(&grade.id, &semester.id, &department.id);
        Fixture { db, context }
    }

    fn pipeline(db: &Database, model: Arc<dyn GenerativeModel>) -> AnswerPipeline {
        let pool = db.pool().clone();
        AnswerPipeline::new(
            Arc::new(SqliteKnowledgeStore::new(pool.clone())),
            Arc::new(SqliteCurriculumStore::new(pool.clone())),
            Arc::new(SqliteTaxonomyRepository::new(pool)),
            GenerativeFallbackClient::new(model, RetryPolicy::default()),
        )
    }

    async fn upload_curriculum(db: &Database, context: &QuestionContext) {
        let (grade, semester, department) = context.full_scope().unwrap();
        let document = CurriculumDocument::new("biology.txt", CURRICULUM, grade, semester)
            .with_departments(vec![department.to_string()]);
        SqliteCurriculumStore::new(db.pool().clone())
            .create(&document)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_knowledge_base_answer_skips_model() {
        let f = fixture().await;
        let entry = KnowledgeEntry::new("ما هي الخلية؟", "الخلية وحدة بناء الكائن الحي")
            .with_context(&f.context);
        SqliteKnowledgeStore::new(f.db.pool().clone())
            .add(&entry)
            .await
            .unwrap();

        let model = ScriptedModel::answering("unused");
        let request = ResolveRequest::new("sara", "  ما هي الخلية؟ ").with_context(f.context.clone());
        let resolution = pipeline(&f.db, model.clone()).resolve(&request).await;

        assert_eq!(resolution.provenance, Provenance::KnowledgeBase);
        assert_eq!(resolution.answer, "الخلية وحدة بناء الكائن الحي");
        assert_eq!(resolution.match_kind, Some(MatchKind::ExactQuestion));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_fatal_model_error_becomes_deflection() {
        let f = fixture().await;
        let model = ScriptedModel::failing("API key not valid");
        let request = ResolveRequest::new("sara", "ما هو التمثيل الضوئي؟").with_context(f.context.clone());

        let resolution = pipeline(&f.db, model.clone()).resolve(&request).await;

        assert_eq!(resolution.provenance, Provenance::Deflection);
        assert_eq!(resolution.answer, messages::deflection(Some("الأحياء")));
        assert!(!resolution.answer.contains("API key"));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_disabled_model_deflects_without_department() {
        let db = Database::in_memory().await.unwrap();
        let request = ResolveRequest::new("sara", "سؤال بلا سياق");

        let resolution = pipeline(&db, Arc::new(DisabledModel)).resolve(&request).await;

        assert_eq!(resolution.provenance, Provenance::Deflection);
        assert_eq!(resolution.answer, messages::deflection(None));
    }

    #[tokio::test]
    async fn test_pending_acceptance_bypasses_every_stage() {
        let f = fixture().await;
        let model = ScriptedModel::answering("unused");
        let request = ResolveRequest::new("sara", "ما هي الخلية؟")
            .with_context(f.context.clone())
            .with_pending("الإجابة المعلقة", " Yes ");

        let resolution = pipeline(&f.db, model.clone()).resolve(&request).await;

        assert_eq!(resolution.provenance, Provenance::Generative);
        assert_eq!(resolution.answer, "الإجابة المعلقة");
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_pending_rejection_cancels() {
        let f = fixture().await;
        let request = ResolveRequest::new("sara", "")
            .with_pending("الإجابة المعلقة", "لا");

        let resolution = pipeline(&f.db, ScriptedModel::answering("unused"))
            .resolve(&request)
            .await;

        assert_eq!(resolution.provenance, Provenance::Cancelled);
        assert_eq!(resolution.answer, messages::CANCELLED);
    }

    #[tokio::test]
    async fn test_grounded_answer_is_generative() {
        let f = fixture().await;
        upload_curriculum(&f.db, &f.context).await;
        let model = ScriptedModel::answering(
            "الخلية هي الوحدة الأساسية في بناء جميع الكائنات الحية. \
             وتتكون الخلية من غشاء خلوي وسيتوبلازم ونواة تحمل المادة الوراثية.",
        );
        let request = ResolveRequest::new("sara", "عرف الخلية").with_context(f.context.clone());

        let resolution = pipeline(&f.db, model.clone()).resolve(&request).await;

        assert_eq!(resolution.provenance, Provenance::Generative);
        assert!(resolution.verification.unwrap().grounded);

        let prompt = model.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("الوحدة الأساسية في بناء"));
        assert!(prompt.contains("القسم: الأحياء"));
        assert!(prompt.contains("السؤال: عرف الخلية"));
    }

    #[tokio::test]
    async fn test_ungrounded_answer_is_still_delivered() {
        let f = fixture().await;
        upload_curriculum(&f.db, &f.context).await;
        let model = ScriptedModel::answering("المريخ هو الكوكب الرابع من حيث البعد عن الشمس.");
        let request = ResolveRequest::new("sara", "ما هو المريخ؟").with_context(f.context.clone());

        let resolution = pipeline(&f.db, model).resolve(&request).await;

        assert_eq!(resolution.provenance, Provenance::GenerativeUnverified);
        assert_eq!(resolution.answer, "المريخ هو الكوكب الرابع من حيث البعد عن الشمس.");
        assert_eq!(
            resolution.verification.unwrap().reason,
            VerificationReason::InsufficientOverlap
        );
    }

    #[tokio::test]
    async fn test_confirm_mode_holds_unverified_answer() {
        let f = fixture().await;
        let model = ScriptedModel::answering("إجابة عامة");
        let request = ResolveRequest::new("sara", "سؤال عام").with_context(f.context.clone());

        let resolution = pipeline(&f.db, model)
            .with_mode(AnswerMode::ConfirmUnverified)
            .resolve(&request)
            .await;

        assert_eq!(resolution.provenance, Provenance::AwaitingConfirmation);
        assert_eq!(resolution.answer, messages::CONFIRMATION_PROMPT);
        assert_eq!(resolution.pending_answer.as_deref(), Some("إجابة عامة"));
    }

    #[tokio::test]
    async fn test_transient_failures_deflect_after_retries() {
        let f = fixture().await;
        let model = ScriptedModel::failing("503 The model is overloaded");
        let client = GenerativeFallbackClient::new(
            model.clone(),
            RetryPolicy {
                max_attempts: 3,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                max_jitter: Duration::ZERO,
                ..RetryPolicy::default()
            },
        );
        let pool = f.db.pool().clone();
        let pipeline = AnswerPipeline::new(
            Arc::new(SqliteKnowledgeStore::new(pool.clone())),
            Arc::new(SqliteCurriculumStore::new(pool.clone())),
            Arc::new(SqliteTaxonomyRepository::new(pool)),
            client,
        );
        let request = ResolveRequest::new("sara", "سؤال").with_context(f.context.clone());

        let resolution = pipeline.resolve(&request).await;

        assert_eq!(resolution.provenance, Provenance::Deflection);
        assert_eq!(model.calls(), 3);
    }

    fn uploads_with(name: &str) -> (tempfile::TempDir, UploadArea) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(name), b"content").unwrap();
        let area = UploadArea::open(dir.path()).unwrap();
        (dir, area)
    }

    #[tokio::test]
    async fn test_file_answer_is_extractor_text_and_file_is_removed() {
        let db = Database::in_memory().await.unwrap();
        let (dir, uploads) = uploads_with("notes.txt");
        let model = ScriptedModel::answering("unused");

        let resolution = pipeline(&db, model.clone())
            .with_uploads(uploads)
            .with_extractor(Arc::new(FixedExtractor(|| Ok("النص المستخرج".to_string()))))
            .resolve(&ResolveRequest::new("sara", "").with_file("notes.txt"))
            .await;

        assert_eq!(resolution.provenance, Provenance::Extraction);
        assert_eq!(resolution.answer, "النص المستخرج");
        assert!(!dir.path().join("notes.txt").exists());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_extraction_keeps_file_and_apologises() {
        let db = Database::in_memory().await.unwrap();
        let (dir, uploads) = uploads_with("scan.png");

        let resolution = pipeline(&db, ScriptedModel::answering("unused"))
            .with_uploads(uploads)
            .with_extractor(Arc::new(FixedExtractor(|| {
                Err(Error::ExtractionFailed("blurry".to_string()))
            })))
            .resolve(&ResolveRequest::new("sara", "").with_file("scan.png"))
            .await;

        assert_eq!(resolution.provenance, Provenance::Error);
        assert_eq!(resolution.answer, messages::extraction_failed(FileKind::Image));
        assert!(dir.path().join("scan.png").exists());
    }

    #[tokio::test]
    async fn test_unsupported_and_missing_files_are_errors() {
        let db = Database::in_memory().await.unwrap();
        let (_dir, uploads) = uploads_with("clip.mp4");
        let pipeline = pipeline(&db, ScriptedModel::answering("unused")).with_uploads(uploads);

        let unsupported = pipeline
            .resolve(&ResolveRequest::new("sara", "").with_file("clip.mp4"))
            .await;
        assert_eq!(unsupported.provenance, Provenance::Error);
        assert_eq!(unsupported.answer, messages::UNSUPPORTED_FILE);

        let missing = pipeline
            .resolve(&ResolveRequest::new("sara", "").with_file("../gone.png"))
            .await;
        assert_eq!(missing.provenance, Provenance::Error);
        assert_eq!(missing.answer, messages::MISSING_FILE);

        let invalid = pipeline
            .resolve(&ResolveRequest::new("sara", "").with_file(".env"))
            .await;
        assert_eq!(invalid.answer, messages::INVALID_FILE);
    }
}
