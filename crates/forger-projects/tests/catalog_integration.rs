//! Integration tests for the stack catalog
//!
//! These tests plan real stacks from the embedded catalog and materialize
//! them into temporary directories with an in-memory template source.

use camino::Utf8PathBuf;
use forger_core::{Materializer, MemorySource};
use forger_projects::{Error, StackCatalog, StackSelection};
use std::sync::Arc;
use tempfile::TempDir;

fn utf8(temp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("temp dir is not UTF-8")
}

/// Every template key in the catalog, with a body that mentions `yourapp`
fn source_for(catalog: &StackCatalog) -> MemorySource {
    catalog
        .languages
        .values()
        .flat_map(|lang| lang.frameworks.values())
        .flat_map(|fw| fw.files.iter())
        .map(|file| {
            (
                file.source.clone(),
                format!("// {}\nmodule yourapp\n", file.source).into_bytes(),
            )
        })
        .collect()
}

#[test]
fn test_every_stack_plans_without_conflicts() {
    let catalog = StackCatalog::embedded().unwrap();
    let root = Utf8PathBuf::from("/projects");

    for language in catalog.language_names() {
        for framework in catalog.framework_names(&language).unwrap() {
            let fw = &catalog.languages[&language].frameworks[&framework];
            let databases: Vec<Option<&str>> = std::iter::once(None)
                .chain(fw.databases.iter().map(|d| Some(d.as_str())))
                .collect();

            for database in &databases {
                for typescript in [false, true] {
                    let selection = StackSelection::new("demo", &language, &framework)
                        .database(*database)
                        .typescript(typescript);

                    match catalog.plan(&selection, &root) {
                        Ok(plan) => {
                            assert!(
                                !plan.manifest.is_empty(),
                                "{language}/{framework} {database:?} produced no tasks"
                            );
                            assert!(plan.manifest.destinations_conflict().is_empty());
                        }
                        Err(Error::UnsupportedStack { .. }) => {}
                        Err(other) => panic!("{language}/{framework}: {other}"),
                    }
                }
            }
        }
    }
}

#[tokio::test]
async fn test_materialize_go_gin_project() {
    let temp = TempDir::new().unwrap();
    let catalog = StackCatalog::embedded().unwrap();
    let source = Arc::new(source_for(&catalog));

    let selection = StackSelection::new("shop", "go", "gin")
        .database(Some("mysql"))
        .orm(Some("gorm"));
    let plan = catalog.plan(&selection, &utf8(&temp)).unwrap();

    plan.ensure_absent().unwrap();
    plan.create_directories().await.unwrap();

    let result = Materializer::default()
        .require_tasks(true)
        .materialize(plan.manifest.clone(), source)
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.attempted(), 3);

    let main = std::fs::read_to_string(temp.path().join("shop/main.go")).unwrap();
    assert!(main.contains("module shop"));
    assert!(!main.contains("yourapp"));

    let db = std::fs::read_to_string(temp.path().join("shop/config/init_db.go")).unwrap();
    assert!(db.contains("init_mysql.txt"));

    assert!(temp.path().join("shop/middleware").is_dir());
    assert!(matches!(
        plan.ensure_absent(),
        Err(Error::ProjectExists { .. })
    ));
}

#[tokio::test]
async fn test_materialize_flask_with_postgres() {
    let temp = TempDir::new().unwrap();
    let catalog = StackCatalog::embedded().unwrap();
    let source = Arc::new(source_for(&catalog));

    let selection = StackSelection::new("blog", "py", "flask").database(Some("postgres"));
    let plan = catalog.plan(&selection, &utf8(&temp)).unwrap();
    plan.create_directories().await.unwrap();

    let result = Materializer::new(2)
        .materialize(plan.manifest.clone(), source)
        .await
        .unwrap();

    assert!(result.is_success());
    let config = std::fs::read_to_string(temp.path().join("blog/app/config.py")).unwrap();
    assert!(config.contains("config_postgres.txt"));
    assert!(temp.path().join("blog/static/css").is_dir());
    assert!(temp.path().join("blog/templates/index.html").exists());
}

#[tokio::test]
async fn test_missing_templates_are_reported_per_file() {
    let temp = TempDir::new().unwrap();
    let catalog = StackCatalog::embedded().unwrap();
    let source = Arc::new(
        MemorySource::new().with_template("templates/node/js/src/index.txt", "app.listen(3000)"),
    );

    let selection = StackSelection::new("api", "nodejs", "express");
    let plan = catalog.plan(&selection, &utf8(&temp)).unwrap();
    plan.create_directories().await.unwrap();

    let result = Materializer::default()
        .materialize(plan.manifest.clone(), source)
        .await
        .unwrap();

    assert_eq!(result.attempted(), 5);
    assert_eq!(result.succeeded(), 1);
    assert_eq!(result.failed(), 4);
    assert_eq!(
        std::fs::read_to_string(temp.path().join("api/src/index.js")).unwrap(),
        "app.listen(3000)"
    );
}

#[test]
fn test_override_catalog_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stacks.yaml");
    std::fs::write(
        &path,
        r#"
version: "1.0"
languages:
  rust:
    description: "Rust"
    placeholders: ["crate_name"]
    frameworks:
      axum:
        description: "Axum"
        files:
          - source: "templates/rust/axum/main.txt"
            destination: "src/main.rs"
"#,
    )
    .unwrap();

    let catalog = StackCatalog::from_file(&path).unwrap();
    let plan = catalog
        .plan(
            &StackSelection::new("svc", "rust", "axum"),
            &Utf8PathBuf::from("/p"),
        )
        .unwrap();

    assert_eq!(plan.manifest.len(), 1);
    assert_eq!(
        plan.manifest.tasks()[0].substitutions().get("crate_name"),
        Some("svc")
    );
    assert!(plan.setup_before.is_empty());
}
