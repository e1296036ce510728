//! Project creation commands (create-go-app, create-python-app, create-node-app)

use crate::cli::CreateArgs;
use crate::commands::load_catalog;
use crate::config::ForgerConfig;
use crate::output;
use anyhow::{anyhow, bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use forger_core::{
    CancellationToken, DirectorySource, MaterializationResult, Materializer, S3Source,
    TemplateSource,
};
use forger_projects::{run_step, ProjectPlan, SetupStep, StackSelection};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Language chosen by the subcommand plus its flags
pub struct CreateRequest {
    pub language: &'static str,
    pub args: CreateArgs,
    pub typescript: bool,
}

pub async fn run(request: CreateRequest, mut config: ForgerConfig, quiet: bool) -> Result<()> {
    let started = Instant::now();
    let CreateRequest {
        language,
        args,
        typescript,
    } = request;

    // CLI flags sit on top of the config hierarchy
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(dir) = &args.template_dir {
        config.template_dir = Some(dir.clone());
    }
    config.validate()?;

    let catalog = load_catalog(&config)?;
    let selection = StackSelection::new(&args.name, language, &args.framework)
        .database(args.database.clone())
        .orm(args.orm.clone())
        .typescript(typescript);

    let parent_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => current_dir()?,
    };
    let plan = catalog.plan(&selection, &parent_dir)?;

    if args.dry_run {
        return print_plan(&plan, args.json);
    }

    plan.ensure_absent()?;

    let source = open_source(&config).await?;
    let show_progress = !quiet && !args.json;

    if show_progress {
        output::info(&format!(
            "Creating {} in {}",
            plan.stack, plan.project_dir
        ));
    }

    plan.create_directories()
        .await
        .with_context(|| format!("Failed to create {}", plan.project_dir))?;

    if !args.skip_setup {
        run_setup(&plan.setup_before, &plan.project_dir, show_progress).await?;
    }

    let result = materialize(&plan, source, config.concurrency, show_progress).await?;

    if args.json {
        let report = json!({
            "project": plan.project_name,
            "project_dir": plan.project_dir,
            "stack": plan.stack,
            "summary": result.summary(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if !result.is_success() {
        if !args.json {
            report_failures(&result);
        }
        bail!(
            "{} of {} templates failed; files already written in {} were kept",
            result.failed(),
            result.attempted(),
            plan.project_dir
        );
    }

    if args.skip_setup {
        if show_progress && !(plan.setup_before.is_empty() && plan.setup_after.is_empty()) {
            output::warning("Skipped toolchain setup; run these in the project directory:");
            for step in plan.setup_before.iter().chain(&plan.setup_after) {
                output::command(&step.command_line());
            }
        }
    } else {
        run_setup(&plan.setup_after, &plan.project_dir, show_progress).await?;
    }

    if show_progress {
        output::success(&format!(
            "Project {} created in {:.2}s",
            plan.project_name,
            started.elapsed().as_secs_f64()
        ));
        print_next_steps(&plan);
    }

    Ok(())
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    Utf8PathBuf::from_path_buf(cwd)
        .map_err(|path| anyhow!("Current directory is not valid UTF-8: {}", path.display()))
}

async fn open_source(config: &ForgerConfig) -> Result<Arc<dyn TemplateSource>> {
    match &config.template_dir {
        Some(dir) => {
            if !dir.is_dir() {
                bail!("Template directory not found: {}", dir);
            }
            debug!("Using local templates from {}", dir);
            Ok(Arc::new(DirectorySource::new(dir.as_std_path())))
        }
        None => {
            debug!("Using templates from s3://{}/{}", config.bucket, config.prefix);
            let source = S3Source::new(&config.s3_source_config())
                .await
                .context("Failed to configure S3 template source")?;
            Ok(Arc::new(source))
        }
    }
}

async fn materialize(
    plan: &ProjectPlan,
    source: Arc<dyn TemplateSource>,
    concurrency: usize,
    show_progress: bool,
) -> Result<MaterializationResult> {
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, waiting for in-flight templates");
                cancel.cancel();
            }
        }
    });

    let spinner = output::spinner(
        &format!(
            "Copying {} templates from {}",
            plan.manifest.len(),
            source.name()
        ),
        !show_progress,
    );

    let result = Materializer::new(concurrency)
        .require_tasks(true)
        .with_cancellation(cancel)
        .materialize(plan.manifest.clone(), source)
        .await;

    watcher.abort();
    spinner.finish_and_clear();

    let result = result?;
    info!(
        "Copied {}/{} templates",
        result.succeeded(),
        result.attempted()
    );
    Ok(result)
}

async fn run_setup(steps: &[SetupStep], dir: &Utf8Path, show_progress: bool) -> Result<()> {
    for step in steps {
        let spinner = output::spinner(&step.to_string(), !show_progress);
        let result = run_step(step, dir).await;
        spinner.finish_and_clear();

        result.context("Toolchain setup failed")?;
        if show_progress {
            output::success(&step.to_string());
        }
    }
    Ok(())
}

fn report_failures(result: &MaterializationResult) {
    for report in result.failures() {
        if let Some(error) = report.outcome.error() {
            output::error(&format!(
                "{} -> {}: {}",
                report.task.source_key(),
                report.task.destination().display(),
                error
            ));
        }
    }
}

fn print_next_steps(plan: &ProjectPlan) {
    output::header("Next steps");
    for step in next_steps(plan) {
        output::command(&step);
    }
}

/// Commands to start working in the project; `cd` targets the real location
fn next_steps(plan: &ProjectPlan) -> Vec<String> {
    let dir = plan.project_dir.as_str();
    let cd = if dir.contains(char::is_whitespace) {
        format!("cd \"{}\"", dir)
    } else {
        format!("cd {}", dir)
    };
    std::iter::once(cd)
        .chain(plan.next_steps.iter().cloned())
        .collect()
}

fn print_plan(plan: &ProjectPlan, as_json: bool) -> Result<()> {
    if as_json {
        let value = json!({
            "project": plan.project_name,
            "project_dir": plan.project_dir,
            "stack": plan.stack,
            "directories": plan.directories,
            "tasks": plan.manifest,
            "setup_before": plan.setup_before,
            "setup_after": plan.setup_after,
            "next_steps": plan.next_steps,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    output::header(&format!("Plan for {}", plan.project_name));
    output::kv("stack", &plan.stack.to_string());
    output::kv("directory", plan.project_dir.as_str());

    output::header("Templates");
    for task in plan.manifest.iter() {
        output::kv(task.source_key(), &task.destination().display().to_string());
    }

    let steps: Vec<_> = plan.setup_before.iter().chain(&plan.setup_after).collect();
    if !steps.is_empty() {
        output::header("Setup");
        for step in steps {
            output::command(&step.to_string());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forger_projects::StackCatalog;

    fn plan_in(parent: &str) -> ProjectPlan {
        let selection = StackSelection::new("shop", "go", "gin");
        StackCatalog::embedded()
            .unwrap()
            .plan(&selection, Utf8Path::new(parent))
            .unwrap()
    }

    #[test]
    fn test_next_steps_cd_into_output_dir() {
        let steps = next_steps(&plan_in("/srv/projects"));
        assert_eq!(steps[0], "cd /srv/projects/shop");
        assert_eq!(steps[1..], ["go run main.go".to_string()]);
    }

    #[test]
    fn test_next_steps_quote_paths_with_spaces() {
        let steps = next_steps(&plan_in("/home/me/My Projects"));
        assert_eq!(steps[0], "cd \"/home/me/My Projects/shop\"");
    }
}
