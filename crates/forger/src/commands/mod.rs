//! Command implementations

pub mod create;
pub mod stacks;
pub mod version;

use crate::config::ForgerConfig;
use anyhow::{Context, Result};
use forger_projects::StackCatalog;

/// The configured catalog, or the built-in one
pub(crate) fn load_catalog(config: &ForgerConfig) -> Result<StackCatalog> {
    match &config.catalog {
        Some(path) => StackCatalog::from_file(path)
            .with_context(|| format!("Failed to load stack catalog {}", path)),
        None => StackCatalog::embedded().context("Built-in stack catalog is invalid"),
    }
}
