//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Forger - scaffold backend projects from templates
#[derive(Parser, Debug)]
#[command(name = "forger")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to config file (default: ~/.forger/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new Go application
    CreateGoApp(CreateGoArgs),

    /// Create a new Python application
    CreatePythonApp(CreatePythonArgs),

    /// Create a new Node.js application
    CreateNodeApp(CreateNodeArgs),

    /// List available languages and frameworks
    Stacks(StacksArgs),

    /// Show version information
    Version(VersionArgs),
}

#[derive(Args, Debug)]
pub struct CreateGoArgs {
    #[command(flatten)]
    pub common: CreateArgs,
}

#[derive(Args, Debug)]
pub struct CreatePythonArgs {
    #[command(flatten)]
    pub common: CreateArgs,
}

#[derive(Args, Debug)]
pub struct CreateNodeArgs {
    #[command(flatten)]
    pub common: CreateArgs,

    /// Generate a TypeScript project
    #[arg(short, long)]
    pub typescript: bool,
}

/// Options shared by every create command
#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Project name (also the directory name)
    pub name: String,

    /// Framework to use
    #[arg(short, long)]
    pub framework: String,

    /// Database to configure
    #[arg(short, long)]
    pub database: Option<String>,

    /// ORM to configure
    #[arg(short, long)]
    pub orm: Option<String>,

    /// Maximum templates downloaded at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Read templates from a local directory instead of S3
    #[arg(long)]
    pub template_dir: Option<Utf8PathBuf>,

    /// Directory the project is created in (default: current directory)
    #[arg(long)]
    pub output_dir: Option<Utf8PathBuf>,

    /// Skip toolchain setup commands
    #[arg(long)]
    pub skip_setup: bool,

    /// Print the plan without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct StacksArgs {
    /// Only show one language
    pub language: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_create_node_app() {
        let cli = Cli::try_parse_from([
            "forger",
            "-vv",
            "create-node-app",
            "api",
            "-f",
            "express",
            "-t",
            "-o",
            "drizzle",
            "-d",
            "postgres",
            "--concurrency",
            "8",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::CreateNodeApp(args) => {
                assert!(args.typescript);
                assert_eq!(args.common.name, "api");
                assert_eq!(args.common.orm.as_deref(), Some("drizzle"));
                assert_eq!(args.common.database.as_deref(), Some("postgres"));
                assert_eq!(args.common.concurrency, Some(8));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_framework_is_required() {
        let err = Cli::try_parse_from(["forger", "create-go-app", "demo"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
