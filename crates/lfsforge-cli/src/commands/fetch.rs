//! `lfsforge fetch`.

use anyhow::Result;
use lfsforge_engine::{Pipeline, Scheduler};

use super::common::{build_context, concurrency, load_store, report, resolve_targets};
use crate::exit_code::ExitCode;

#[allow(clippy::too_many_arguments)]
pub fn run(
    cfg: lfsforge_config::Config,
    all: bool,
    pkg: Vec<String>,
    update: bool,
    git_update: bool,
    remove_cache: bool,
    jobs: Option<usize>,
) -> Result<ExitCode> {
    let store = load_store(&cfg)?;
    let targets = if all {
        store.all().into_iter().map(|r| r.name.clone()).collect()
    } else {
        resolve_targets(&store, &pkg)
    };

    let jobs = concurrency(&cfg, jobs);
    let ctx = build_context(cfg)?;

    if remove_cache {
        for name in &targets {
            let dir = ctx.layout.sources(name);
            if dir.as_std_path().exists() {
                std::fs::remove_dir_all(dir.as_std_path())?;
            }
        }
    }

    let force = update || git_update;
    let pipeline = Pipeline::new(&ctx);
    let scheduler = Scheduler::new(jobs);
    let results = scheduler.run(&store, &targets, |recipe| pipeline.fetch(recipe, force))?;

    Ok(report(&results, &targets))
}
