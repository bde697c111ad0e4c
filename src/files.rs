//! Local file store holding uploaded source files.
//!
//! Files live under `<root>/public/<name>` or `<root>/private/<name>`.
//! Names are plain relative paths; absolute paths and `..` components are
//! rejected so a run can never read outside the store.

use std::path::{Component, Path, PathBuf};

use doc_intake_core::models::SourceFile;

use crate::error::IntakeError;

/// Where the pipeline reads source bytes from.
pub trait FileSource: Send + Sync {
    fn read(
        &self,
        name: &str,
        is_private: bool,
        content_type: &str,
    ) -> Result<SourceFile, IntakeError>;
}

pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a stored file, validating the name.
    pub fn resolve(&self, name: &str, is_private: bool) -> Result<PathBuf, IntakeError> {
        let rel = Path::new(name);
        if name.trim().is_empty() {
            return Err(IntakeError::File("file name is empty".to_string()));
        }
        let safe = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(IntakeError::File(format!(
                "file name must be relative and stay inside the store: {}",
                name
            )));
        }
        let scope = if is_private { "private" } else { "public" };
        Ok(self.root.join(scope).join(rel))
    }
}

impl FileSource for LocalFileStore {
    fn read(
        &self,
        name: &str,
        is_private: bool,
        content_type: &str,
    ) -> Result<SourceFile, IntakeError> {
        let path = self.resolve(name, is_private)?;
        let bytes = std::fs::read(&path)
            .map_err(|e| IntakeError::File(format!("{}: {}", path.display(), e)))?;
        let file_name = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        Ok(SourceFile {
            name: file_name,
            content_type: content_type.to_string(),
            is_private,
            bytes,
        })
    }
}
