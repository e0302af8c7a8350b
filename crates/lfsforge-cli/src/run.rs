//! Entry point and dispatch. Owns config discovery and
//! maps every subcommand onto its handler in [`crate::commands`].

use clap::Parser;

use crate::args::{Cli, Commands};
use crate::commands;
use crate::exit_code::ExitCode;

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = lfsforge_utils::logging::init_tracing(cli.verbose) {
        eprintln!("warning: failed to initialize logging: {e}");
    }

    let overrides = lfsforge_config::CliOverrides {
        root: cli.root.clone(),
        ..Default::default()
    };
    let cfg = if let Some(path) = &cli.config {
        match std::fs::read_to_string(path.as_std_path()) {
            Ok(text) => match toml::from_str::<lfsforge_config::Config>(&text) {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprintln!("error: invalid config file {path}: {e}");
                    return ExitCode::UsageError;
                }
            },
            Err(e) => {
                eprintln!("error: failed to read config file {path}: {e}");
                return ExitCode::UsageError;
            }
        }
    } else {
        match lfsforge_config::Config::discover(&overrides) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("error: {e:#}");
                return ExitCode::UsageError;
            }
        }
    };

    let result = match cli.command {
        Commands::Fetch {
            all,
            pkg,
            update,
            git_update,
            remove_cache,
            jobs,
        } => commands::fetch::run(cfg, all, pkg, update, git_update, remove_cache, jobs),
        Commands::Extract { pkg, jobs } => commands::extract::run(cfg, pkg, jobs),
        Commands::Build {
            continue_,
            no_strip,
            retry,
            jobs,
            mode,
            pkg,
        } => commands::build::run(cfg, continue_, no_strip, retry, jobs, mode, pkg),
        Commands::Install {
            continue_,
            verify_only,
            dry_run,
            root,
            jobs: _,
            pkg,
        } => commands::install::run(cfg, continue_, verify_only, dry_run, root, pkg),
        Commands::Recipe { action } => commands::recipe::run(cfg, action),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::LoadError
        }
    }
}
