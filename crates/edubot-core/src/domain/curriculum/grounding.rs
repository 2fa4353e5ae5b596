//! Curriculum text forwarded to the generative model

use crate::config::CurriculumConfig;

/// Separator placed between documents in a prompt
pub const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

/// Join at most `max_documents` non-empty documents, each cut to
/// `max_document_chars` characters. `None` when nothing is left.
pub fn assemble(documents: &[String], limits: &CurriculumConfig) -> Option<String> {
    let parts: Vec<&str> = documents
        .iter()
        .map(String::as_str)
        .filter(|doc| !doc.trim().is_empty())
        .take(limits.max_documents)
        .map(|doc| truncate_chars(doc, limits.max_document_chars))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(DOCUMENT_SEPARATOR))
    }
}

/// Prefix of `text` holding at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
