//! Access to the unpacked bundle's file tree.

use crate::error::{Error, Result};
use crate::pages::to_unix;
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

/// Read-only view of an unpacked bundle
pub trait FileTree {
    /// Every regular file below the root, as forward-slash relative paths
    fn list(&self) -> Result<Vec<String>>;

    /// Raw bytes of a file given by its relative path
    fn read(&self, relative: &str) -> Result<Vec<u8>>;

    /// Returns true if a regular file exists at the relative path
    fn exists(&self, relative: &str) -> bool;

    /// File content decoded as UTF-8 (lossily)
    fn read_to_string(&self, relative: &str) -> Result<String> {
        let bytes = self.read(relative)?;
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }
}

/// [`FileTree`] over a directory on disk
#[derive(Debug, Clone)]
pub struct DirTree {
    root: PathBuf,
}

impl DirTree {
    /// Creates a tree rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory this tree is rooted at
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }
}

impl FileTree for DirTree {
    fn list(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        // Sorted so that repeated listings of the same snapshot agree
        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                Error::file_read(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            files.push(to_unix(&relative.to_string_lossy()));
        }
        trace!("Listed {} file(s) under {}", files.len(), self.root.display());
        Ok(files)
    }

    fn read(&self, relative: &str) -> Result<Vec<u8>> {
        let path = self.resolve(relative);
        std::fs::read(&path).map_err(|e| Error::file_read(path, e))
    }

    fn exists(&self, relative: &str) -> bool {
        self.resolve(relative).is_file()
    }
}
