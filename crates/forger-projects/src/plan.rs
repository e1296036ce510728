//! Project planning
//!
//! Turns a stack selection into the directories, copy manifest and setup
//! steps needed to generate one project.

use crate::catalog::{FileEntry, FrameworkStack, SetupConfig, StackCatalog, StepEntry};
use crate::error::{Error, Result};
use crate::toolchain::SetupStep;
use camino::{Utf8Path, Utf8PathBuf};
use forger_core::{CopyTask, Manifest};
use serde::Serialize;
use tracing::{debug, warn};

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSelection {
    pub project_name: String,
    pub language: String,
    pub framework: String,
    pub database: Option<String>,
    pub orm: Option<String>,
    pub typescript: bool,
}

impl StackSelection {
    pub fn new(
        project_name: impl Into<String>,
        language: impl Into<String>,
        framework: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            language: language.into(),
            framework: framework.into(),
            database: None,
            orm: None,
            typescript: false,
        }
    }

    pub fn database(mut self, database: Option<impl Into<String>>) -> Self {
        self.database = database.map(Into::into);
        self
    }

    pub fn orm(mut self, orm: Option<impl Into<String>>) -> Self {
        self.orm = orm.map(Into::into);
        self
    }

    pub fn typescript(mut self, typescript: bool) -> Self {
        self.typescript = typescript;
        self
    }
}

/// Canonical stack after alias resolution and defaulting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStack {
    pub language: String,
    pub framework: String,
    pub database: Option<String>,
    pub orm: Option<String>,
    pub typescript: bool,
}

impl std::fmt::Display for ResolvedStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.language, self.framework)?;
        if self.typescript {
            write!(f, " (typescript)")?;
        }
        if let Some(orm) = &self.orm {
            write!(f, " + {}", orm)?;
        }
        if let Some(db) = &self.database {
            write!(f, " + {}", db)?;
        }
        Ok(())
    }
}

/// Everything needed to generate one project
#[derive(Debug, Clone)]
pub struct ProjectPlan {
    pub project_name: String,
    pub project_dir: Utf8PathBuf,
    pub stack: ResolvedStack,
    /// Absolute directories to create, project root first
    pub directories: Vec<Utf8PathBuf>,
    pub manifest: Manifest,
    pub setup_before: Vec<SetupStep>,
    pub setup_after: Vec<SetupStep>,
    pub next_steps: Vec<String>,
}

impl ProjectPlan {
    /// Refuse to generate over an existing path
    pub fn ensure_absent(&self) -> Result<()> {
        if self.project_dir.exists() {
            return Err(Error::project_exists(self.project_dir.as_str()));
        }
        Ok(())
    }

    /// Create the project root and the framework's directories
    pub async fn create_directories(&self) -> Result<()> {
        for dir in &self.directories {
            debug!("Creating directory {}", dir);
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}

impl StackCatalog {
    /// Build the plan for `selection` under `parent_dir`
    pub fn plan(&self, selection: &StackSelection, parent_dir: &Utf8Path) -> Result<ProjectPlan> {
        validate_project_name(&selection.project_name)?;

        let (lang_name, language) = self.language(&selection.language)?;
        let (fw_name, framework) = self.framework(lang_name, &selection.framework)?;

        let database = pick_option(
            "database",
            selection.database.as_deref(),
            &framework.databases,
            framework.default_database.as_deref(),
        );
        let orm = pick_option(
            "orm",
            selection.orm.as_deref(),
            &framework.orms,
            framework.default_orm.as_deref(),
        );
        let stack = ResolvedStack {
            language: lang_name.to_string(),
            framework: fw_name.to_string(),
            database,
            orm,
            typescript: selection.typescript,
        };

        check_supported(framework, &stack)?;

        let project_dir = parent_dir.join(&selection.project_name);

        let mut directories = vec![project_dir.clone()];
        directories.extend(
            framework
                .directories
                .iter()
                .filter(|d| {
                    d.applies(stack.database.as_deref(), stack.orm.as_deref(), stack.typescript)
                })
                .map(|d| project_dir.join(d.path())),
        );

        let manifest = build_manifest(
            &framework.files,
            &stack,
            &project_dir,
            &language.placeholders,
            &selection.project_name,
        )?;

        let setup_before = collect_steps(
            [&language.setup, &framework.setup],
            |setup| &setup.before,
            &stack,
            &selection.project_name,
        );
        let setup_after = collect_steps(
            [&language.setup, &framework.setup],
            |setup| &setup.after,
            &stack,
            &selection.project_name,
        );

        debug!(
            "Planned {} with {} task(s) for {}",
            stack,
            manifest.len(),
            project_dir
        );

        Ok(ProjectPlan {
            project_name: selection.project_name.clone(),
            project_dir,
            stack,
            directories,
            manifest,
            setup_before,
            setup_after,
            next_steps: framework.next_steps.clone(),
        })
    }
}

/// Letters, digits, '-', '_' and '.', starting with a letter or digit
pub fn validate_project_name(name: &str) -> Result<()> {
    let valid_start = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if !valid_start || !valid_chars {
        return Err(Error::invalid_project_name(name));
    }
    Ok(())
}

/// Resolve a user choice against the framework's supported values.
///
/// Unsupported values fall back to the default with a warning.
fn pick_option(
    what: &str,
    requested: Option<&str>,
    supported: &[String],
    default: Option<&str>,
) -> Option<String> {
    let requested = requested
        .map(|r| r.trim().to_lowercase())
        .filter(|r| !r.is_empty());

    match requested {
        Some(value) if supported.contains(&value) => Some(value),
        Some(value) => {
            match default {
                Some(fallback) => {
                    warn!("Unsupported {} '{}', using '{}'", what, value, fallback)
                }
                None => warn!("Unsupported {} '{}', ignoring", what, value),
            }
            default.map(str::to_string)
        }
        None => default.map(str::to_string),
    }
}

fn check_supported(framework: &FrameworkStack, stack: &ResolvedStack) -> Result<()> {
    let rejected = framework.unsupported.iter().find(|condition| {
        condition.matches(
            stack.database.as_deref(),
            stack.orm.as_deref(),
            stack.typescript,
        )
    });

    match rejected {
        Some(condition) => Err(Error::unsupported_stack(format!(
            "{}/{} does not support {}",
            stack.language, stack.framework, condition
        ))),
        None => Ok(()),
    }
}

/// Matching entries become tasks; a later entry for the same destination
/// replaces the earlier one in place.
fn build_manifest(
    files: &[FileEntry],
    stack: &ResolvedStack,
    project_dir: &Utf8Path,
    placeholders: &[String],
    project_name: &str,
) -> Result<Manifest> {
    let mut selected: Vec<&FileEntry> = Vec::new();

    for entry in files.iter().filter(|entry| {
        entry.when.matches(
            stack.database.as_deref(),
            stack.orm.as_deref(),
            stack.typescript,
        )
    }) {
        match selected
            .iter_mut()
            .find(|existing| existing.destination == entry.destination)
        {
            Some(existing) => {
                debug!(
                    "{} replaces {} for {}",
                    entry.source, existing.source, entry.destination
                );
                *existing = entry;
            }
            None => selected.push(entry),
        }
    }

    selected
        .into_iter()
        .map(|entry| {
            CopyTask::builder(&entry.source, project_dir.join(&entry.destination))
                .substitutions(placeholders.iter().map(|p| (p.as_str(), project_name)))
                .build()
                .map_err(Error::from)
        })
        .collect()
}

fn collect_steps<'a>(
    setups: [&'a SetupConfig; 2],
    phase: impl Fn(&'a SetupConfig) -> &'a Vec<StepEntry>,
    stack: &ResolvedStack,
    project_name: &str,
) -> Vec<SetupStep> {
    setups
        .into_iter()
        .flat_map(phase)
        .filter(|step| {
            step.when.matches(
                stack.database.as_deref(),
                stack.orm.as_deref(),
                stack.typescript,
            )
        })
        .filter_map(|step| {
            SetupStep::from_argv(&step.run, step.description.as_deref(), project_name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StackCatalog {
        StackCatalog::embedded().unwrap()
    }

    fn root() -> Utf8PathBuf {
        Utf8PathBuf::from("/work")
    }

    #[test]
    fn test_project_name_validation() {
        for ok in ["demo", "my-app", "app_2", "v1.0", "9lives"] {
            assert!(validate_project_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", ".", "..", "-app", "a/b", "a\\b", "my app", ".hidden"] {
            assert!(
                matches!(
                    validate_project_name(bad),
                    Err(Error::InvalidProjectName { .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_pick_option() {
        let supported = vec!["mysql".to_string(), "sqlite".to_string()];
        assert_eq!(
            pick_option("database", Some("MySQL"), &supported, Some("sqlite")),
            Some("mysql".to_string())
        );
        assert_eq!(
            pick_option("database", Some("oracle"), &supported, Some("sqlite")),
            Some("sqlite".to_string())
        );
        assert_eq!(pick_option("orm", Some("ent"), &supported, None), None);
        assert_eq!(
            pick_option("database", None, &supported, Some("sqlite")),
            Some("sqlite".to_string())
        );
    }

    #[test]
    fn test_go_gin_with_gorm_postgres() {
        let selection = StackSelection::new("demo", "go", "gin")
            .database(Some("postgres"))
            .orm(Some("gorm"));
        let plan = catalog().plan(&selection, &root()).unwrap();

        assert_eq!(plan.project_dir, Utf8PathBuf::from("/work/demo"));
        assert_eq!(plan.stack.database.as_deref(), Some("postgres"));
        assert_eq!(plan.manifest.len(), 3);
        assert!(plan.manifest.destinations_conflict().is_empty());

        let db_task = plan
            .manifest
            .iter()
            .find(|t| t.destination().ends_with("config/init_db.go"))
            .unwrap();
        assert_eq!(
            db_task.source_key(),
            "templates/go/databases/gorm/init_pg.txt"
        );
        assert_eq!(db_task.substitutions().get("yourapp"), Some("demo"));

        assert_eq!(plan.directories[0], plan.project_dir);
        assert!(plan
            .directories
            .contains(&Utf8PathBuf::from("/work/demo/middleware")));

        assert_eq!(plan.setup_before.len(), 1);
        assert_eq!(plan.setup_before[0].command_line(), "go mod init demo");
        assert_eq!(plan.setup_after[0].command_line(), "go mod tidy");
    }

    #[test]
    fn test_go_without_orm_skips_database_files() {
        let selection = StackSelection::new("demo", "golang", "fiber");
        let plan = catalog().plan(&selection, &root()).unwrap();

        assert_eq!(plan.stack.orm, None);
        assert_eq!(plan.manifest.len(), 3);
        assert!(!plan
            .manifest
            .iter()
            .any(|t| t.destination().ends_with("config/init_db.go")));
    }

    #[test]
    fn test_flask_unknown_database_falls_back_to_sqlite() {
        let selection = StackSelection::new("demo", "python", "flask").database(Some("oracle"));
        let plan = catalog().plan(&selection, &root()).unwrap();

        assert_eq!(plan.stack.database.as_deref(), Some("sqlite"));
        let config: Vec<_> = plan
            .manifest
            .iter()
            .filter(|t| t.destination().ends_with("app/config.py"))
            .collect();
        assert_eq!(config.len(), 1);
        assert_eq!(
            config[0].source_key(),
            "templates/python/flask/app/database/config_sqlite.txt"
        );
        assert_eq!(plan.setup_after.len(), 3);
        assert_eq!(
            plan.setup_after[1].command_line(),
            "flask db migrate -m \"Initial migration\""
        );
    }

    #[test]
    fn test_node_javascript() {
        let selection = StackSelection::new("api", "node", "express");
        let plan = catalog().plan(&selection, &root()).unwrap();

        assert_eq!(plan.manifest.len(), 5);
        assert!(plan
            .manifest
            .iter()
            .all(|t| t.substitutions().is_empty()));
        assert_eq!(plan.setup_before[0].command_line(), "npm init -y");
        assert_eq!(plan.setup_after.len(), 1);
    }

    #[test]
    fn test_node_typescript_mongoose_skips_install() {
        let selection = StackSelection::new("api", "node", "express").typescript(true);
        let plan = catalog().plan(&selection, &root()).unwrap();

        assert_eq!(plan.stack.orm.as_deref(), Some("mongoose"));
        assert_eq!(plan.manifest.len(), 6);
        assert!(plan.setup_after.is_empty());
    }

    #[test]
    fn test_node_typescript_drizzle_postgres() {
        let selection = StackSelection::new("api", "node", "express")
            .typescript(true)
            .orm(Some("drizzle"))
            .database(Some("postgres"));
        let plan = catalog().plan(&selection, &root()).unwrap();

        assert!(plan.manifest.destinations_conflict().is_empty());
        let package = plan
            .manifest
            .iter()
            .find(|t| t.destination().ends_with("package.json"))
            .unwrap();
        assert_eq!(
            package.source_key(),
            "templates/node/ts/drizzle/db/pg/package.txt"
        );
        assert_eq!(plan.setup_after.len(), 1);

        let dirs: Vec<&str> = plan
            .directories
            .iter()
            .filter_map(|d| d.strip_prefix(&plan.project_dir).ok())
            .map(|d| d.as_str())
            .collect();
        for expected in [
            "src/routes",
            "src/controllers",
            "src/db",
            "src/db/schema",
            "src/constants",
            "src/middlewares",
            "src/utils",
            "src/types",
        ] {
            assert!(dirs.contains(&expected), "missing {expected}");
        }
        assert!(!dirs.contains(&"src/models"));
    }

    #[test]
    fn test_node_javascript_directories() {
        let selection = StackSelection::new("api", "node", "express");
        let plan = catalog().plan(&selection, &root()).unwrap();

        assert!(plan
            .directories
            .contains(&Utf8PathBuf::from("/work/api/src/models")));
        assert!(!plan
            .directories
            .contains(&Utf8PathBuf::from("/work/api/src/db/schema")));
    }

    #[test]
    fn test_node_typescript_drizzle_mongodb_is_unsupported() {
        let selection = StackSelection::new("api", "node", "express")
            .typescript(true)
            .orm(Some("drizzle"));
        let err = catalog().plan(&selection, &root()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedStack { .. }));
    }

    #[test]
    fn test_invalid_name_rejected_before_lookup() {
        let selection = StackSelection::new("../escape", "cobol", "none");
        let err = catalog().plan(&selection, &root()).unwrap_err();
        assert!(matches!(err, Error::InvalidProjectName { .. }));
    }

    #[test]
    fn test_later_entry_replaces_earlier_destination() {
        let entries = vec![
            FileEntry {
                source: "a.txt".into(),
                destination: "main.go".into(),
                when: Default::default(),
            },
            FileEntry {
                source: "b.txt".into(),
                destination: "other.go".into(),
                when: Default::default(),
            },
            FileEntry {
                source: "c.txt".into(),
                destination: "main.go".into(),
                when: Default::default(),
            },
        ];
        let stack = ResolvedStack {
            language: "go".into(),
            framework: "gin".into(),
            database: None,
            orm: None,
            typescript: false,
        };

        let manifest = build_manifest(&entries, &stack, Utf8Path::new("/p"), &[], "p").unwrap();
        let keys: Vec<_> = manifest.iter().map(|t| t.source_key()).collect();
        assert_eq!(keys, vec!["c.txt", "b.txt"]);
    }
}
