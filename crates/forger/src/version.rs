//! Build and catalog versions reported by `forger version`

use forger_core::DEFAULT_CONCURRENCY;
use forger_projects::StackCatalog;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: String,
    /// `version` field of the built-in stack catalog
    pub catalog_version: String,
    pub languages: Vec<String>,
    pub default_concurrency: usize,
}

impl VersionInfo {
    pub fn new(catalog: &StackCatalog) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            catalog_version: catalog.version.clone(),
            languages: catalog.language_names(),
            default_concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "forger {} (catalog {}: {})",
            self.version,
            self.catalog_version,
            self.languages.join(", ")
        )
    }
}
