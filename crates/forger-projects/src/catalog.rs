//! Stack catalog parsing and lookup.
//!
//! Parses `stacks.yaml` into strongly-typed structures. The embedded catalog
//! is compiled into the binary; a replacement can be loaded from disk.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path};
use tracing::debug;

const EMBEDDED_CATALOG: &str = include_str!("../templates/stacks.yaml");

/// Complete stack catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackCatalog {
    pub version: String,
    pub languages: BTreeMap<String, LanguageStack>,
}

/// A language and the frameworks available for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageStack {
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Strings replaced by the project name in every template
    #[serde(default)]
    pub placeholders: Vec<String>,
    #[serde(default)]
    pub setup: SetupConfig,
    pub frameworks: BTreeMap<String, FrameworkStack>,
}

/// A framework definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameworkStack {
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub databases: Vec<String>,
    #[serde(default)]
    pub default_database: Option<String>,
    #[serde(default)]
    pub orms: Vec<String>,
    #[serde(default)]
    pub default_orm: Option<String>,
    /// Combinations rejected at plan time
    #[serde(default)]
    pub unsupported: Vec<Condition>,
    /// Directories created even when no template lands in them
    #[serde(default)]
    pub directories: Vec<DirectoryEntry>,
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub setup: SetupConfig,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

/// One template to copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Key in the template source
    pub source: String,
    /// Path relative to the project directory
    pub destination: String,
    #[serde(default)]
    pub when: Condition,
}

/// A directory to create, either a bare path or a path with a condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectoryEntry {
    Path(String),
    Conditional {
        path: String,
        #[serde(default)]
        when: Condition,
    },
}

impl DirectoryEntry {
    /// Path relative to the project directory
    pub fn path(&self) -> &str {
        match self {
            Self::Path(path) | Self::Conditional { path, .. } => path,
        }
    }

    /// Whether the directory belongs to the resolved stack
    pub fn applies(&self, database: Option<&str>, orm: Option<&str>, typescript: bool) -> bool {
        match self {
            Self::Path(_) => true,
            Self::Conditional { when, .. } => when.matches(database, orm, typescript),
        }
    }
}

/// Commands run around materialization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetupConfig {
    #[serde(default)]
    pub before: Vec<StepEntry>,
    #[serde(default)]
    pub after: Vec<StepEntry>,
}

/// One external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEntry {
    /// argv, program first
    pub run: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub when: Condition,
}

/// Restricts an entry to a stack choice; unset fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub orm: Option<String>,
    #[serde(default)]
    pub typescript: Option<bool>,
}

impl Condition {
    /// Check the condition against resolved choices
    pub fn matches(&self, database: Option<&str>, orm: Option<&str>, typescript: bool) -> bool {
        let database_ok = self
            .database
            .as_deref()
            .is_none_or(|want| database == Some(want));
        let orm_ok = self.orm.as_deref().is_none_or(|want| orm == Some(want));
        let typescript_ok = self.typescript.is_none_or(|want| want == typescript);

        database_ok && orm_ok && typescript_ok
    }

    pub fn is_empty(&self) -> bool {
        self.database.is_none() && self.orm.is_none() && self.typescript.is_none()
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(ts) = self.typescript {
            parts.push(if ts { "typescript" } else { "javascript" }.to_string());
        }
        if let Some(orm) = &self.orm {
            parts.push(format!("orm {}", orm));
        }
        if let Some(db) = &self.database {
            parts.push(format!("database {}", db));
        }
        write!(f, "{}", parts.join(" + "))
    }
}

impl StackCatalog {
    /// Load the catalog compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_yaml(EMBEDDED_CATALOG)
    }

    /// Load a catalog from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!("Loading stack catalog from {}", path.as_ref().display());
        let yaml = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&yaml)
    }

    /// Parse and validate a catalog from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let catalog: Self = serde_yaml_ng::from_str(yaml)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check structural invariants the planner relies on
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        for (lang_name, language) in &self.languages {
            if language.frameworks.is_empty() {
                errors.push(format!("{}: no frameworks defined", lang_name));
            }
            for placeholder in &language.placeholders {
                if placeholder.is_empty() {
                    errors.push(format!("{}: empty placeholder", lang_name));
                }
            }
            check_steps(&language.setup, lang_name, &mut errors);

            for (fw_name, framework) in &language.frameworks {
                let scope = format!("{}/{}", lang_name, fw_name);

                if let Some(default) = &framework.default_database {
                    if !framework.databases.contains(default) {
                        errors.push(format!(
                            "{}: default database '{}' is not in databases",
                            scope, default
                        ));
                    }
                }
                if let Some(default) = &framework.default_orm {
                    if !framework.orms.contains(default) {
                        errors.push(format!("{}: default orm '{}' is not in orms", scope, default));
                    }
                }
                for dir in &framework.directories {
                    if !is_relative_inside(dir.path()) {
                        errors.push(format!(
                            "{}: directory '{}' escapes the project",
                            scope,
                            dir.path()
                        ));
                    }
                }
                for file in &framework.files {
                    if file.source.trim().is_empty() {
                        errors.push(format!("{}: file entry with empty source", scope));
                    }
                    if !is_relative_inside(&file.destination) {
                        errors.push(format!(
                            "{}: destination '{}' escapes the project",
                            scope, file.destination
                        ));
                    }
                }
                check_steps(&framework.setup, &scope, &mut errors);
            }
        }

        if !errors.is_empty() {
            return Err(Error::invalid_catalog(errors.join("; ")));
        }

        Ok(())
    }

    /// Resolve a language name or alias, case-insensitively
    pub fn language(&self, input: &str) -> Result<(&str, &LanguageStack)> {
        let wanted = input.trim().to_lowercase();

        self.languages
            .iter()
            .find(|(name, lang)| {
                **name == wanted || lang.aliases.iter().any(|a| a.to_lowercase() == wanted)
            })
            .map(|(name, lang)| (name.as_str(), lang))
            .ok_or_else(|| Error::unknown_language(input, self.language_names().join(", ")))
    }

    /// Resolve a framework name or alias within a language
    pub fn framework<'a>(
        &'a self,
        language: &str,
        input: &str,
    ) -> Result<(&'a str, &'a FrameworkStack)> {
        let (lang_name, lang) = self.language(language)?;
        let wanted = input.trim().to_lowercase();

        lang.frameworks
            .iter()
            .find(|(name, fw)| {
                **name == wanted || fw.aliases.iter().any(|a| a.to_lowercase() == wanted)
            })
            .map(|(name, fw)| (name.as_str(), fw))
            .ok_or_else(|| {
                Error::unknown_framework(
                    lang_name,
                    input,
                    lang.frameworks.keys().cloned().collect::<Vec<_>>().join(", "),
                )
            })
    }

    /// Canonical language names
    pub fn language_names(&self) -> Vec<String> {
        self.languages.keys().cloned().collect()
    }

    /// Canonical framework names of a language
    pub fn framework_names(&self, language: &str) -> Result<Vec<String>> {
        let (_, lang) = self.language(language)?;
        Ok(lang.frameworks.keys().cloned().collect())
    }
}

fn check_steps(setup: &SetupConfig, scope: &str, errors: &mut Vec<String>) {
    for step in setup.before.iter().chain(&setup.after) {
        if step.run.first().is_none_or(|program| program.trim().is_empty()) {
            errors.push(format!("{}: setup step without a program", scope));
        }
    }
}

/// Relative path that stays inside its base directory
fn is_relative_inside(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
