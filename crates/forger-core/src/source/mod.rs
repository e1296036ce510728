//! Template source trait and implementations
//!
//! A template source is an opaque key -> bytes lookup. The materializer makes
//! no assumption about the backend; sources must tolerate concurrent fetches.

pub mod directory;
pub mod memory;
pub mod s3;

use crate::error::FetchError;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for template backends
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Fetch the raw content stored under `key`
    ///
    /// Returns `FetchError::NotFound` when the key does not exist and another
    /// `FetchError` variant when the backend could not be read.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, FetchError>;

    /// Source name for log and error messages
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: TemplateSource + ?Sized> TemplateSource for Arc<T> {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(key).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[async_trait]
impl<T: TemplateSource + ?Sized> TemplateSource for Box<T> {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(key).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

pub use directory::DirectorySource;
pub use memory::MemorySource;
pub use s3::{S3Source, S3SourceConfig};

#[cfg(test)]
mod tests {
    use super::*;

    async fn fetch_via<S: TemplateSource>(source: &S) -> Vec<u8> {
        source.fetch("a.txt").await.unwrap()
    }

    #[tokio::test]
    async fn test_boxed_and_shared_sources() {
        let boxed: Box<dyn TemplateSource> =
            Box::new(MemorySource::new().with_template("a.txt", "boxed"));
        assert_eq!(fetch_via(&boxed).await, b"boxed");
        assert_eq!(boxed.name(), "memory");

        let shared = Arc::new(MemorySource::new().with_template("a.txt", "shared"));
        assert_eq!(fetch_via(&shared).await, b"shared");
    }
}
