//! Source directory layout: discovering and reading knowledge base documents
//!
//! ```text
//! {PLC_KB_DIR}/
//!   iec61131_st_syntax.md
//!   safety_interlocks.md
//!   vendor/
//!     codesys_notes.txt
//! ```
//!
//! The root is scanned recursively. Paths are sorted so repeated loads of the
//! same tree yield the same document (and therefore entry) order.

use crate::config::SourceConfig;
use crate::knowledge_base::loader::{LoadError, SourceDocument};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

impl SourceConfig {
    /// Whether `path` has one of the configured document extensions.
    pub fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }

    /// All document paths under the root, sorted. A missing root yields none.
    pub fn list_documents(&self) -> Result<Vec<PathBuf>, LoadError> {
        let mut files = Vec::new();
        if !self.dir.exists() {
            return Ok(files);
        }
        self.collect_documents(&self.dir, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn collect_documents(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), LoadError> {
        let io_err = |source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        };
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            // file_type() does not follow symlinks, so a link back into the
            // tree cannot make the walk revisit it.
            let file_type = entry.file_type().map_err(io_err)?;
            let path = entry.path();
            if file_type.is_dir() {
                self.collect_documents(&path, files)?;
            } else if file_type.is_symlink() && path.is_dir() {
                debug!(path = %path.display(), "Skipping symlinked directory");
            } else if self.is_document(&path) {
                files.push(path);
            }
        }
        Ok(())
    }

    /// Name of a document relative to the root, with `/` separators.
    pub fn document_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.dir).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Read every document under the root.
    ///
    /// Any unreadable file fails the whole read. Invalid UTF-8 is replaced
    /// rather than rejected.
    pub fn read_documents(&self) -> Result<Vec<SourceDocument>, LoadError> {
        if !self.dir.exists() {
            info!(dir = %self.dir.display(), "No knowledge base directory found, starting empty");
            return Ok(Vec::new());
        }

        let paths = self.list_documents()?;
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = std::fs::read(&path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
            let name = self.document_name(&path);
            debug!(document = %name, bytes = bytes.len(), "Read knowledge base document");
            documents.push(SourceDocument::new(
                name,
                String::from_utf8_lossy(&bytes).into_owned(),
            ));
        }
        Ok(documents)
    }

    /// Modification times of every document, used by the watcher.
    pub fn document_mtimes(&self) -> Vec<(PathBuf, SystemTime)> {
        self.list_documents()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|path| {
                let mtime = std::fs::metadata(&path).ok()?.modified().ok()?;
                Some((path, mtime))
            })
            .collect()
    }
}
