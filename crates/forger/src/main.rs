//! Forger CLI - scaffold backend projects from templates
//!
//! This is the main entry point for the Forger command-line interface.

mod cli;
mod commands;
mod config;
mod output;
mod version;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};
use commands::create::CreateRequest;
use config::ConfigLoader;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let load_config = || ConfigLoader::new(cli.config.as_deref()).load();

    match cli.command {
        Commands::CreateGoApp(args) => {
            let request = CreateRequest {
                language: "go",
                args: args.common,
                typescript: false,
            };
            commands::create::run(request, load_config()?, cli.quiet).await
        }
        Commands::CreatePythonApp(args) => {
            let request = CreateRequest {
                language: "python",
                args: args.common,
                typescript: false,
            };
            commands::create::run(request, load_config()?, cli.quiet).await
        }
        Commands::CreateNodeApp(args) => {
            let request = CreateRequest {
                language: "node",
                args: args.common,
                typescript: args.typescript,
            };
            commands::create::run(request, load_config()?, cli.quiet).await
        }
        Commands::Stacks(args) => commands::stacks::run(args, &load_config()?),
        Commands::Version(args) => commands::version::run(args),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
