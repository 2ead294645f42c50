use crate::domain::ports::SourceReader;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// File system source reader. Relative paths resolve against `root` when
/// one is set, otherwise against the working directory.
#[derive(Debug, Clone, Default)]
pub struct FileSourceReader {
    root: Option<PathBuf>,
}

impl FileSourceReader {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl SourceReader for FileSourceReader {
    fn read(&self, path: &Path) -> Result<String> {
        let full = self.resolve(path);
        std::fs::read_to_string(&full)
            .with_context(|| format!("Failed to read source file: {}", full.display()))
    }
}
