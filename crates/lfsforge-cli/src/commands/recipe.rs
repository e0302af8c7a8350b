//! `lfsforge recipe show`. Read-only; does not touch the pipeline state.

use anyhow::Result;

use super::common::load_store;
use crate::args::RecipeAction;
use crate::exit_code::ExitCode;

pub fn run(cfg: lfsforge_config::Config, action: RecipeAction) -> Result<ExitCode> {
    match action {
        RecipeAction::Show { name } => show(&cfg, &name),
    }
}

fn show(cfg: &lfsforge_config::Config, name: &str) -> Result<ExitCode> {
    let store = load_store(cfg)?;
    let Ok(recipe) = store.find(name) else {
        println!("{name}: no such recipe");
        return Ok(ExitCode::PackageFailed);
    };

    println!("name: {}", recipe.name);
    println!("version: {}", recipe.version);
    if let Some(description) = &recipe.description {
        println!("description: {description}");
    }
    if let Some(license) = &recipe.license {
        println!("license: {license}");
    }
    println!("mode: {:?}", recipe.build.mode);
    if !recipe.depends.is_empty() {
        println!("depends: {}", recipe.depends.join(", "));
    }
    println!("sources: {}", recipe.sources.len());
    for source in &recipe.sources {
        if let Some(url) = source.url() {
            println!("  - {url}");
        } else {
            println!("  - (git source)");
        }
    }

    Ok(ExitCode::Success)
}
