//! The upload area learners' and administrators' files live in

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A directory that every resolved file must stay inside
#[derive(Debug, Clone)]
pub struct UploadArea {
    root: PathBuf,
}

/// Reduce a client-supplied name to a bare, safe file name
///
/// Drops directory components and rejects empty or hidden names.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() || c == ':' { '_' } else { c })
        .collect();

    if cleaned.is_empty() || cleaned.starts_with('.') {
        None
    } else {
        Some(cleaned)
    }
}

impl UploadArea {
    /// Open (and create if missing) the upload directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a file reference to an existing file inside the area
    pub fn resolve(&self, file_ref: &str) -> Result<PathBuf> {
        let name = sanitize_file_name(file_ref)
            .ok_or_else(|| Error::InvalidInput(format!("invalid file name '{}'", file_ref)))?;

        let candidate = self.root.join(&name);
        if !candidate.is_file() {
            return Err(Error::FileNotFound(name));
        }

        let resolved = candidate.canonicalize()?;
        if !resolved.starts_with(&self.root) {
            warn!(file = %file_ref, "File reference escapes the upload area");
            return Err(Error::InvalidInput(format!(
                "file '{}' is outside the upload area",
                file_ref
            )));
        }
        Ok(resolved)
    }

    /// Copy a file into the area under a unique name; returns that name
    pub async fn import(&self, source: &Path) -> Result<String> {
        let original = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .and_then(|name| sanitize_file_name(&name))
            .ok_or_else(|| {
                Error::InvalidInput(format!("invalid file name '{}'", source.display()))
            })?;

        let stored = format!("{}_{}", Uuid::new_v4().simple(), original);
        tokio::fs::copy(source, self.root.join(&stored))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::FileNotFound(source.display().to_string()),
                _ => Error::Io(e),
            })?;

        info!(file = %stored, "Imported file into upload area");
        Ok(stored)
    }

    /// Delete a processed file. Failures are logged, never returned.
    pub async fn remove(&self, path: &Path) {
        if !path.starts_with(&self.root) {
            warn!(path = %path.display(), "Refusing to delete a file outside the upload area");
            return;
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => info!(path = %path.display(), "Deleted processed upload"),
            Err(e) => warn!(path = %path.display(), error = %e, "Could not delete processed upload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_file_name("C:\\uploads\\scan.png").as_deref(), Some("scan.png"));
        assert_eq!(sanitize_file_name("صورة السبورة.jpg").as_deref(), Some("صورة السبورة.jpg"));
        assert_eq!(sanitize_file_name(".env"), None);
        assert_eq!(sanitize_file_name("dir/"), None);
        assert_eq!(sanitize_file_name("   "), None);
    }

    #[test]
    fn test_resolve_stays_inside_area() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::open(dir.path().join("uploads")).unwrap();
        std::fs::write(area.root().join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("secret.txt"), "x").unwrap();

        let resolved = area.resolve("notes.txt").unwrap();
        assert!(resolved.starts_with(area.root()));

        // traversal collapses to a bare name that does not exist inside
        assert!(matches!(area.resolve("../secret.txt"), Err(Error::FileNotFound(_))));
        assert!(matches!(area.resolve(".."), Err(Error::InvalidInput(_))));
        assert!(matches!(area.resolve("missing.png"), Err(Error::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_import_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lesson.txt");
        std::fs::write(&source, "content").unwrap();
        let area = UploadArea::open(dir.path().join("uploads")).unwrap();

        let stored = area.import(&source).await.unwrap();
        assert!(stored.ends_with("_lesson.txt"));

        let path = area.resolve(&stored).unwrap();
        area.remove(&path).await;
        assert!(!path.exists());
        assert!(source.exists(), "source must not be touched");

        // outside paths are left alone
        area.remove(&source).await;
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_import_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::open(dir.path().join("uploads")).unwrap();
        let result = area.import(&dir.path().join("nope.pdf")).await;
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }
}
