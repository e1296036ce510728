//! Toolchain setup steps
//!
//! Runs the language tooling (`go mod`, `npm`, `pip`, `flask db`) inside a
//! freshly generated project.

use crate::error::{Error, Result};
use camino::Utf8Path;
use serde::Serialize;
use std::fmt;
use tokio::process::Command;
use tracing::{debug, info};

/// Placeholder expanded in step arguments
pub const PROJECT_NAME_VAR: &str = "{project_name}";

/// A single external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupStep {
    pub program: String,
    pub args: Vec<String>,
    pub description: Option<String>,
}

impl SetupStep {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Build a step from an argv list, expanding `{project_name}`
    pub(crate) fn from_argv(
        argv: &[String],
        description: Option<&str>,
        project_name: &str,
    ) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args
                .iter()
                .map(|arg| arg.replace(PROJECT_NAME_VAR, project_name))
                .collect(),
            description: description.map(str::to_string),
        })
    }

    /// Shell-like rendering for display
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.contains(char::is_whitespace) {
                    format!("\"{}\"", part)
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} ({})", description, self.command_line()),
            None => write!(f, "{}", self.command_line()),
        }
    }
}

/// Check that the step's program is on PATH
pub fn check_available(step: &SetupStep) -> Result<()> {
    which::which(&step.program)
        .map(|path| debug!("Found {} at {}", step.program, path.display()))
        .map_err(|_| Error::command_not_found(&step.program))
}

/// Run one step in `dir`, capturing its output
pub async fn run_step(step: &SetupStep, dir: &Utf8Path) -> Result<String> {
    check_available(step)?;

    debug!("Running: {} in {}", step.command_line(), dir);
    let output = Command::new(&step.program)
        .args(&step.args)
        .current_dir(dir)
        .output()
        .await?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        return Err(Error::StepFailed {
            command: step.command_line(),
            status: output.status.to_string(),
            output: combined.trim_end().to_string(),
        });
    }

    Ok(combined)
}

/// Run steps in order, stopping at the first failure
pub async fn run_steps(steps: &[SetupStep], dir: &Utf8Path) -> Result<()> {
    for step in steps {
        info!("{}", step);
        run_step(step, dir).await?;
    }
    Ok(())
}
