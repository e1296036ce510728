//! Local directory template source
//!
//! Resolves keys as relative paths under a root directory. Keys that would
//! escape the root (absolute paths, `..` components) are rejected.

use crate::error::FetchError;
use crate::source::TemplateSource;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Templates read from a directory tree mirroring the bucket layout
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under the root
    fn resolve(&self, key: &str) -> Result<PathBuf, FetchError> {
        let relative = Path::new(key.trim_start_matches('/'));
        let escapes = key.starts_with('/')
            || relative.components().any(|c| {
                matches!(
                    c,
                    Component::ParentDir | Component::RootDir | Component::Prefix(_)
                )
            });

        if escapes || relative.as_os_str().is_empty() {
            return Err(FetchError::backend(
                key,
                format!("key is not a relative path under {}", self.root.display()),
            ));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl TemplateSource for DirectorySource {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(key)?;
        debug!("Reading template: {}", path.display());

        match tokio::fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::not_found(key)),
            Err(e) => Err(FetchError::io(key, e)),
        }
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}
