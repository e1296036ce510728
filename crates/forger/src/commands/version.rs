//! Version command

use crate::cli::VersionArgs;
use crate::version::VersionInfo;
use anyhow::{Context, Result};
use forger_projects::StackCatalog;

pub fn run(args: VersionArgs) -> Result<()> {
    let catalog = StackCatalog::embedded().context("Built-in stack catalog is invalid")?;
    let info = VersionInfo::new(&catalog);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{}", info);
    }

    Ok(())
}
