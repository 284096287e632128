//! Persistence of assembled artifacts.

use crate::assemble::Artifact;
use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Destination for assembled artifacts
pub trait ArtifactSink {
    /// Persists one artifact and returns where it went
    fn write(&mut self, artifact: &Artifact) -> Result<PathBuf>;
}

/// Writes artifacts as pretty-printed JSON below a root directory
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    root: PathBuf,
    force: bool,
}

impl JsonDirSink {
    /// Creates a sink writing below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            force: false,
        }
    }

    /// Sets whether existing files may be overwritten
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Output path of `relative`, refusing anything that escapes the root
    pub fn target(&self, relative: &str) -> Result<PathBuf> {
        let relative_path = Path::new(relative);
        let escapes = relative_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::path_traversal(relative_path));
        }
        Ok(self.root.join(relative_path))
    }
}

impl ArtifactSink for JsonDirSink {
    fn write(&mut self, artifact: &Artifact) -> Result<PathBuf> {
        let path = self.target(&artifact.path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::directory_create(parent, e))?;
        }
        if path.exists() && !self.force {
            return Err(Error::FileExists { path });
        }

        let mut content = serde_json::to_string_pretty(&artifact.document)?;
        content.push('\n');
        let mut file = fs::File::create(&path).map_err(|e| Error::file_write(&path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| Error::file_write(&path, e))?;
        Ok(path)
    }
}

/// Records target paths without touching the filesystem
#[derive(Debug, Clone, Default)]
pub struct DryRunSink {
    root: PathBuf,
    /// Paths that would have been written
    pub planned: Vec<PathBuf>,
}

impl DryRunSink {
    /// Creates a sink planning writes below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            planned: Vec::new(),
        }
    }
}

impl ArtifactSink for DryRunSink {
    fn write(&mut self, artifact: &Artifact) -> Result<PathBuf> {
        let path = JsonDirSink::new(&self.root).target(&artifact.path)?;
        self.planned.push(path.clone());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let mut sink = JsonDirSink::new(dir.path());
        let path = sink
            .write(&Artifact::new("pages/index/index.json", json!({"window": {}})))
            .unwrap();

        assert_eq!(path, dir.path().join("pages/index/index.json"));
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, json!({"window": {}}));
    }

    #[test]
    fn test_refuses_overwrite_unless_forced() {
        let dir = TempDir::new().unwrap();
        let artifact = Artifact::new("app.json", json!({}));

        JsonDirSink::new(dir.path()).write(&artifact).unwrap();
        let err = JsonDirSink::new(dir.path()).write(&artifact).unwrap_err();
        assert!(matches!(err, Error::FileExists { .. }));
        assert!(JsonDirSink::new(dir.path()).force(true).write(&artifact).is_ok());
    }

    #[test]
    fn test_path_traversal_rejected() {
        let sink = JsonDirSink::new("/out");
        assert!(matches!(
            sink.target("../etc/passwd"),
            Err(Error::PathTraversal { .. })
        ));
        assert!(matches!(sink.target("/abs.json"), Err(Error::PathTraversal { .. })));
        assert!(sink.target("__plugin__/p/c.json").is_ok());
    }

    #[test]
    fn test_dry_run_records_without_writing() {
        let dir = TempDir::new().unwrap();
        let mut sink = DryRunSink::new(dir.path());
        sink.write(&Artifact::new("a.json", json!({}))).unwrap();

        assert_eq!(sink.planned, vec![dir.path().join("a.json")]);
        assert!(!dir.path().join("a.json").exists());
    }
}
