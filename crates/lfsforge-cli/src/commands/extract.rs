//! `lfsforge extract`.

use anyhow::Result;
use lfsforge_engine::{Pipeline, Scheduler};

use super::common::{build_context, concurrency, load_store, report, resolve_targets};
use crate::exit_code::ExitCode;

pub fn run(cfg: lfsforge_config::Config, pkg: Vec<String>, jobs: Option<usize>) -> Result<ExitCode> {
    let store = load_store(&cfg)?;
    let targets = resolve_targets(&store, &pkg);
    let jobs = concurrency(&cfg, jobs);
    let ctx = build_context(cfg)?;

    let pipeline = Pipeline::new(&ctx);
    let scheduler = Scheduler::new(jobs);
    let results = scheduler.run(&store, &targets, |recipe| pipeline.extract(recipe, false))?;

    Ok(report(&results, &targets))
}
