//! # forger-projects
//!
//! Project stacks for the Forger CLI providing:
//! - The stack catalog (languages, frameworks, templates per database/ORM)
//! - Project planning: directories, copy manifest and setup steps
//! - Toolchain setup (`go mod`, `npm`, `pip`, `flask db`)
//!
//! # Examples
//!
//! ```no_run
//! use camino::Utf8Path;
//! use forger_projects::{StackCatalog, StackSelection};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = StackCatalog::embedded()?;
//! let selection = StackSelection::new("shop", "go", "gin")
//!     .database(Some("postgres"))
//!     .orm(Some("gorm"));
//!
//! let plan = catalog.plan(&selection, Utf8Path::new("/tmp"))?;
//! println!("{} templates for {}", plan.manifest.len(), plan.stack);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod plan;
pub mod toolchain;

pub use catalog::{
    Condition, DirectoryEntry, FileEntry, FrameworkStack, LanguageStack, StackCatalog,
};
pub use error::{Error, Result};
pub use plan::{validate_project_name, ProjectPlan, ResolvedStack, StackSelection};
pub use toolchain::{run_step, run_steps, SetupStep};
