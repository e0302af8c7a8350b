//! `lfsforge build`.

use anyhow::Result;
use lfsforge_engine::{pipeline::BuildOptions, Pipeline, Scheduler};

use super::common::{build_context, concurrency, load_store, report, resolve_targets};
use crate::args::ExecModeArg;
use crate::exit_code::ExitCode;

#[allow(clippy::too_many_arguments)]
pub fn run(
    cfg: lfsforge_config::Config,
    continue_: bool,
    no_strip: bool,
    retry: Option<u32>,
    jobs: Option<usize>,
    mode: Option<ExecModeArg>,
    pkg: Vec<String>,
) -> Result<ExitCode> {
    let store = load_store(&cfg)?;
    let targets = resolve_targets(&store, &pkg);
    let jobs = concurrency(&cfg, jobs);
    let ctx = build_context(cfg)?;

    let mut opts = BuildOptions::from_config(&ctx);
    opts.force = !continue_;
    if no_strip {
        opts.strip = false;
    }
    if let Some(retries) = retry {
        opts.retries = retries;
    }
    if let Some(mode) = mode {
        opts.exec_mode_override = mode.into();
    }

    let pipeline = Pipeline::new(&ctx);
    let scheduler = Scheduler::new(jobs);
    let results = scheduler.run(&store, &targets, |recipe| pipeline.build(recipe, &opts))?;

    Ok(report(&results, &targets))
}
