//! Local text extraction for documents

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::{ContentExtractor, FileKind, extension_of};

/// Reads txt, pdf and docx files without any remote service
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExtractor;

impl LocalExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Heading placed above text extracted from a document
    pub fn heading_for(extension: &str) -> &'static str {
        match extension {
            "pdf" => "النص المستخرج من ملف PDF:",
            "docx" | "doc" => "النص المستخرج من ملف Word:",
            _ => "النص المستخرج من الملف:",
        }
    }

    /// Plain text of a document, trimmed and never empty
    pub async fn read_text(&self, path: &Path) -> Result<String> {
        let extension = extension_of(path).unwrap_or_default();
        let owned: PathBuf = path.to_path_buf();

        let text = match extension.as_str() {
            "txt" => read_txt(&owned).await?,
            "pdf" => run_blocking(move || read_pdf(&owned)).await?,
            "docx" => run_blocking(move || read_docx(&owned)).await?,
            "doc" => {
                return Err(Error::ExtractionUnsupported(
                    "legacy .doc files cannot be read, save the file as .docx".to_string(),
                ));
            }
            other => {
                return Err(Error::ExtractionUnsupported(format!(
                    "'.{}' is not a supported document format",
                    other
                )));
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(Error::ExtractionFailed(format!(
                "{} contains no extractable text",
                path.display()
            )));
        }

        debug!(path = %path.display(), chars = text.chars().count(), "Extracted document text");
        Ok(text.to_string())
    }
}

#[async_trait]
impl ContentExtractor for LocalExtractor {
    async fn extract(&self, path: &Path, kind: FileKind, _question: Option<&str>) -> Result<String> {
        match kind {
            FileKind::Document => {
                let text = self.read_text(path).await?;
                let extension = extension_of(path).unwrap_or_default();
                Ok(format!("{}\n\n{}", Self::heading_for(&extension), text))
            }
            FileKind::Image | FileKind::Audio => Err(Error::ExtractionFailed(format!(
                "no local reader for {} files",
                kind
            ))),
        }
    }
}

async fn run_blocking<F>(job: F) -> Result<String>
where
    F: FnOnce() -> Result<String> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| Error::ExtractionFailed(format!("extraction task failed: {}", e)))?
}

async fn read_txt(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::ExtractionFailed(format!("cannot read {}: {}", path.display(), e)))?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(path = %path.display(), "Text file is not valid UTF-8, replacing bad bytes");
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

fn read_pdf(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::ExtractionFailed(format!("cannot read {}: {}", path.display(), e)))?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| Error::ExtractionFailed(format!("unreadable PDF: {}", e)))?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

fn read_docx(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::ExtractionFailed(format!("cannot open {}: {}", path.display(), e)))?;

    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::ExtractionFailed(format!("not a DOCX archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::ExtractionFailed(format!("DOCX missing word/document.xml: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| Error::ExtractionFailed(format!("cannot read document.xml: {}", e)))?;

    Ok(extract_docx_text(&xml))
}

/// Text runs of a WordprocessingML body, one line per paragraph
pub fn extract_docx_text(xml: &str) -> String {
    let mut paragraphs = Vec::new();

    for paragraph in xml.split("</w:p>") {
        let mut text = String::new();
        let mut rest = paragraph;

        while let Some(start) = rest.find("<w:t") {
            let after = &rest[start + 4..];
            // <w:tab/>, <w:tbl>, <w:tc> share the prefix
            if !matches!(after.chars().next(), Some('>') | Some(' ')) {
                rest = after;
                continue;
            }
            let Some(open_end) = after.find('>') else {
                break;
            };
            if after[..open_end].ends_with('/') {
                rest = &after[open_end + 1..];
                continue;
            }
            let body = &after[open_end + 1..];
            let Some(close) = body.find("</w:t>") else {
                break;
            };
            text.push_str(&decode_entities(&body[..close]));
            rest = &body[close + "</w:t>".len()..];
        }

        if !text.trim().is_empty() {
            paragraphs.push(text);
        }
    }

    paragraphs.join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
