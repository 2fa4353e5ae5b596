//! Extraction backed by the generative model
//!
//! Documents are read locally; images and audio are sent to the model as
//! inline data. The extracted text is then used to answer the learner's
//! question about the file.

use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::llm::{GenerativeFallbackClient, MediaInput};

use super::document::LocalExtractor;
use super::{ContentExtractor, FileKind, extension_of};

/// Largest attachment sent inline
pub const MAX_INLINE_BYTES: u64 = 20 * 1024 * 1024;

const ANALYSIS_UNAVAILABLE: &str = "(لم أتمكن من تحليل المحتوى بواسطة الذكاء الاصطناعي)";

fn mime_type(extension: &str) -> Option<&'static str> {
    Some(match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp3" => "audio/mp3",
        "wav" => "audio/wav",
        "m4a" => "audio/aac",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        _ => return None,
    })
}

fn transcription_prompt(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Image => {
            "استخرج كل النص الموجود في هذه الصورة كما هو. إذا لم يوجد نص فصف محتوى الصورة بإيجاز."
        }
        _ => "حوّل الكلام في هذا الملف الصوتي إلى نص مكتوب كما هو دون إضافة أو تعليق.",
    }
}

fn heading(kind: FileKind, extension: &str) -> &'static str {
    match kind {
        FileKind::Image => "النص المستخرج من الصورة:",
        FileKind::Audio => "النص المستخرج من الملف الصوتي:",
        FileKind::Document => LocalExtractor::heading_for(extension),
    }
}

fn source_label(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Image => "صورة",
        FileKind::Audio => "ملف صوتي",
        FileKind::Document => "ملف",
    }
}

/// Extractor that reads every modality and answers questions about the file
#[derive(Debug, Clone)]
pub struct GenerativeExtractor {
    documents: LocalExtractor,
    client: GenerativeFallbackClient,
}

impl GenerativeExtractor {
    pub fn new(client: GenerativeFallbackClient) -> Self {
        Self {
            documents: LocalExtractor::new(),
            client,
        }
    }

    async fn transcribe(&self, path: &Path, kind: FileKind, extension: &str) -> Result<String> {
        let mime = mime_type(extension).ok_or_else(|| {
            Error::ExtractionUnsupported(format!("no media type known for '.{}'", extension))
        })?;

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::ExtractionFailed(format!("cannot read {}: {}", path.display(), e)))?;
        if metadata.len() > MAX_INLINE_BYTES {
            return Err(Error::ExtractionFailed(format!(
                "{} is larger than {} bytes",
                path.display(),
                MAX_INLINE_BYTES
            )));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::ExtractionFailed(format!("cannot read {}: {}", path.display(), e)))?;

        let text = self
            .client
            .ask_with_media(transcription_prompt(kind), &MediaInput::new(mime, bytes))
            .await
            .map_err(|e| Error::ExtractionFailed(format!("{} transcription failed: {}", kind, e)))?;

        let text = text.trim();
        if text.is_empty() {
            return Err(Error::ExtractionFailed(format!("no text found in the {}", kind)));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl ContentExtractor for GenerativeExtractor {
    async fn extract(&self, path: &Path, kind: FileKind, question: Option<&str>) -> Result<String> {
        let extension = extension_of(path).unwrap_or_default();
        let heading = heading(kind, &extension);
        let enabled = self.client.model().is_enabled();

        let text = match kind {
            FileKind::Document => self.documents.read_text(path).await?,
            FileKind::Image | FileKind::Audio if enabled => {
                self.transcribe(path, kind, &extension).await?
            }
            FileKind::Image | FileKind::Audio => {
                return Err(Error::ExtractionFailed(format!(
                    "{} files need the generative model, which is not configured",
                    kind
                )));
            }
        };

        if !enabled {
            return Ok(format!("{}\n\n{}", heading, text));
        }

        let question = question
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| kind.default_question());
        let prompt = format!(
            "بناءً على النص التالي المستخرج من {}:\n\n{}\n\nأجب على السؤال التالي: {}",
            source_label(kind),
            text,
            question
        );

        match self.client.ask(&prompt).await {
            Ok(answer) => {
                info!(kind = kind.as_str(), "Answered question about uploaded file");
                Ok(format!("{}\n{}\n\n---\n\nالإجابة:\n{}", heading, text, answer.trim()))
            }
            Err(e) => {
                warn!(kind = kind.as_str(), error = %e, "Could not analyse extracted text");
                Ok(format!("{}\n{}\n\n{}", heading, text, ANALYSIS_UNAVAILABLE))
            }
        }
    }
}
