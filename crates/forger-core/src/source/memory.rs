//! In-memory template source

use crate::error::FetchError;
use crate::source::TemplateSource;
use async_trait::async_trait;
use std::collections::HashMap;

/// Templates held in a map; used for tests and embedded template sets
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    templates: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template, builder style
    pub fn with_template(mut self, key: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(key, content);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.templates.insert(key.into(), content.into());
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for MemorySource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            templates: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl TemplateSource for MemorySource {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        self.templates
            .get(key)
            .cloned()
            .ok_or_else(|| FetchError::not_found(key))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
