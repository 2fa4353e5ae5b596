//! Content extraction from uploaded files
//!
//! - `document`: local text extraction for txt, pdf and docx
//! - `media`: extraction that also reads images and audio through the
//!   generative model and answers the learner's question about the file
//! - `uploads`: the directory learners' files are placed in

mod document;
mod media;
mod uploads;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use document::{LocalExtractor, extract_docx_text};
pub use media::GenerativeExtractor;
pub use uploads::UploadArea;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
const DOCUMENT_EXTENSIONS: [&str; 4] = ["pdf", "doc", "docx", "txt"];
const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "wav", "m4a", "ogg", "flac", "webm"];

/// Broad modality of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Image,
    Document,
    Audio,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::Audio => "audio",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.to_lowercase();
        let ext = extension.as_str();
        if IMAGE_EXTENSIONS.contains(&ext) {
            Some(Self::Image)
        } else if DOCUMENT_EXTENSIONS.contains(&ext) {
            Some(Self::Document)
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            Some(Self::Audio)
        } else {
            None
        }
    }

    /// Classify a file by its extension
    pub fn classify(path: &Path) -> Result<Self> {
        let extension = extension_of(path).unwrap_or_default();
        Self::from_extension(&extension).ok_or_else(|| {
            Error::ExtractionUnsupported(format!(
                "'{}' is not an image, document or audio file",
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default()
            ))
        })
    }

    /// Question used when the learner sent a file without one
    pub fn default_question(&self) -> &'static str {
        match self {
            Self::Image => "حلل هذه الصورة واستخرج النص منها",
            Self::Document => "لخص محتوى هذا الملف",
            Self::Audio => "استخرج النص من هذا الملف الصوتي",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase extension of a path, if any
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Turns an uploaded file into plain text
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Extract text for `kind`; `question` is what the learner asked about the file
    ///
    /// Fails with `ExtractionUnsupported` for formats it cannot read and
    /// `ExtractionFailed` for unreadable or empty input.
    async fn extract(&self, path: &Path, kind: FileKind, question: Option<&str>) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(FileKind::classify(Path::new("scan.JPG")).unwrap(), FileKind::Image);
        assert_eq!(FileKind::classify(Path::new("notes.docx")).unwrap(), FileKind::Document);
        assert_eq!(FileKind::classify(Path::new("lecture.m4a")).unwrap(), FileKind::Audio);
        assert_eq!(FileKind::classify(Path::new("voice.webm")).unwrap(), FileKind::Audio);
    }

    #[test]
    fn test_unknown_extensions_are_unsupported() {
        for name in ["video.mp4", "archive.zip", "noextension"] {
            assert!(matches!(
                FileKind::classify(Path::new(name)),
                Err(Error::ExtractionUnsupported(_))
            ));
        }
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("a/b/File.PDF")).as_deref(), Some("pdf"));
        assert_eq!(extension_of(Path::new("README")), None);
    }
}
