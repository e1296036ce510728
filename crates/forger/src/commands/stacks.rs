//! Stacks command

use crate::cli::StacksArgs;
use crate::commands::load_catalog;
use crate::config::ForgerConfig;
use crate::output;
use anyhow::Result;
use forger_projects::{FrameworkStack, LanguageStack, StackCatalog};
use std::collections::BTreeMap;

pub fn run(args: StacksArgs, config: &ForgerConfig) -> Result<()> {
    let catalog = load_catalog(config)?;
    let selected = select(&catalog, args.language.as_deref())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
        return Ok(());
    }

    for (name, language) in &selected {
        output::header(&format!("{} - {}", name, language.description));
        if !language.aliases.is_empty() {
            output::kv("aliases", &language.aliases.join(", "));
        }
        for (fw_name, framework) in &language.frameworks {
            println!("  {}  {}", console::style(fw_name).bold(), framework.description);
            print_options(framework);
        }
    }

    Ok(())
}

fn select<'a>(
    catalog: &'a StackCatalog,
    language: Option<&str>,
) -> Result<BTreeMap<&'a str, &'a LanguageStack>> {
    match language {
        Some(input) => {
            let (name, lang) = catalog.language(input)?;
            Ok(BTreeMap::from([(name, lang)]))
        }
        None => Ok(catalog
            .languages
            .iter()
            .map(|(name, lang)| (name.as_str(), lang))
            .collect()),
    }
}

fn print_options(framework: &FrameworkStack) {
    let mark_default = |values: &[String], default: Option<&str>| {
        values
            .iter()
            .map(|v| {
                if Some(v.as_str()) == default {
                    format!("{} (default)", v)
                } else {
                    v.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    if !framework.databases.is_empty() {
        println!(
            "      databases: {}",
            mark_default(&framework.databases, framework.default_database.as_deref())
        );
    }
    if !framework.orms.is_empty() {
        println!(
            "      orms:      {}",
            mark_default(&framework.orms, framework.default_orm.as_deref())
        );
    }
}
