//! Shared wiring for every subcommand: building the [`PackageContext`],
//! resolving a target package list, and reporting a [`Scheduler`] run's
//! result table as end-of-run user-visible output.

use std::collections::HashMap;

use anyhow::{Context, Result};
use lfsforge_config::Config;
use lfsforge_engine::{PackageContext, TargetResult};
use lfsforge_recipe::RecipeStore;

use crate::exit_code::ExitCode;

pub fn load_store(cfg: &Config) -> Result<RecipeStore> {
    RecipeStore::load_dir(&cfg.recipes_dir)
        .with_context(|| format!("failed to load recipes from {}", cfg.recipes_dir))
}

pub fn build_context(cfg: Config) -> Result<PackageContext> {
    PackageContext::new(cfg).context("failed to initialize package context")
}

/// `targets` named explicitly on the CLI, or every recipe known to the
/// store when none were named.
pub fn resolve_targets(store: &RecipeStore, named: &[String]) -> Vec<String> {
    if named.is_empty() {
        store.all().into_iter().map(|r| r.name.clone()).collect()
    } else {
        named.to_vec()
    }
}

pub fn concurrency(cfg: &Config, jobs: Option<usize>) -> usize {
    jobs.unwrap_or(cfg.concurrency).max(1)
}

/// Prints one line per target package and returns the process exit code.
pub fn report(results: &HashMap<String, TargetResult>, targets: &[String]) -> ExitCode {
    let mut any_failed = false;
    for name in targets {
        let Some(result) = results.get(name) else {
            continue;
        };
        match result {
            TargetResult::Ok => println!("{name}: ok"),
            TargetResult::Skipped(reason) => println!("{name}: skipped ({reason})"),
            TargetResult::Failed(reason) => {
                println!("{name}: failed ({reason})");
                any_failed = true;
            }
            TargetResult::Blocked => {
                println!("{name}: blocked");
                any_failed = true;
            }
        }
    }

    if any_failed {
        ExitCode::PackageFailed
    } else {
        ExitCode::Success
    }
}

