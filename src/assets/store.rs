use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::foundation::error::{PortraitError, PortraitResult};
use crate::foundation::fs::{copy_atomic, ensure_dir, extension_lower};
use crate::project::{SourceRef, StoredProject};

/// Extensions accepted by [`ImageStore::import`].
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "bmp", "gif"];

/// Per-project store of imported source images, addressed by generated [`SourceRef`]s.
///
/// Holds no state beyond the directory it points at; every call goes to the filesystem.
#[derive(Clone, Debug)]
pub struct ImageStore {
    sources_dir: PathBuf,
}

impl ImageStore {
    /// Store rooted at `sources_dir`; the directory is created on first import.
    pub fn new(sources_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources_dir: sources_dir.into(),
        }
    }

    /// Store for the `sources/` directory of `project`.
    pub fn for_project(project: &StoredProject) -> Self {
        Self::new(project.sources_dir())
    }

    /// Directory holding the imported files.
    pub fn sources_dir(&self) -> &Path {
        &self.sources_dir
    }

    /// Copy `file_path` into the store under a fresh identifier, keeping its extension.
    ///
    /// Nothing is left behind when the copy fails.
    pub fn import(&self, file_path: &Path) -> PortraitResult<SourceRef> {
        if !file_path.is_file() {
            return Err(PortraitError::not_found(format!(
                "source image '{}'",
                file_path.display()
            )));
        }
        let ext = extension_lower(file_path).unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(PortraitError::validation(format!(
                "unsupported image extension '{ext}' for '{}'",
                file_path.display()
            )));
        }

        ensure_dir(&self.sources_dir)?;
        let source_ref = SourceRef::generate();
        let dest = self.sources_dir.join(format!("{source_ref}.{ext}"));
        copy_atomic(file_path, &dest)?;
        debug!(source = %source_ref, from = %file_path.display(), "imported source image");
        Ok(source_ref)
    }

    /// Locate the stored file for `source_ref`, whatever its extension.
    pub fn resolve(&self, source_ref: &SourceRef) -> Option<PathBuf> {
        let rd = fs::read_dir(&self.sources_dir).ok()?;
        let mut matches: Vec<PathBuf> = rd
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| s == source_ref.as_str())
            })
            .collect();
        if matches.len() > 1 {
            matches.sort();
            warn!(
                source = %source_ref,
                count = matches.len(),
                "ambiguous source image, using first"
            );
        }
        matches.into_iter().next()
    }

    /// Like [`ImageStore::resolve`] but a miss is a `NotFound` error.
    pub fn require(&self, source_ref: &SourceRef) -> PortraitResult<PathBuf> {
        self.resolve(source_ref).ok_or_else(|| {
            PortraitError::not_found(format!(
                "source '{source_ref}' in '{}'",
                self.sources_dir.display()
            ))
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
