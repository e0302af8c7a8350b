//! CLI argument definitions.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};

/// lfsforge - Linux-From-Scratch build orchestrator.
#[derive(Parser)]
#[command(name = "lfsforge")]
#[command(about = "Bounded-concurrency, crash-resumable build orchestrator for LFS/BLFS recipe fleets")]
#[command(version)]
pub struct Cli {
    /// Explicit config file path (bypasses upward discovery of
    /// `.lfsforge/config.toml`).
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Override the orchestrator's root directory (sources/build/packages/state/logs).
    #[arg(long, global = true)]
    pub root: Option<Utf8PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Acquire source artifacts into the sources cache.
    Fetch {
        /// Fetch every recipe known to the Recipe Store.
        #[arg(long)]
        all: bool,
        /// One or more package names to fetch.
        #[arg(long = "pkg")]
        pkg: Vec<String>,
        /// Re-verify/re-download even if the cache already holds a
        /// checksum-verified artifact.
        #[arg(long)]
        update: bool,
        /// Re-fetch git sources (pull/fast-forward) even if already cloned.
        #[arg(long)]
        git_update: bool,
        /// Remove the sources cache for the targeted packages before
        /// fetching.
        #[arg(long)]
        remove_cache: bool,
        /// Worker pool size; defaults to config/host CPU count.
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Materialize workspaces from cached sources and apply patches.
    Extract {
        /// One or more package names; defaults to every recipe known to
        /// the Recipe Store.
        #[arg(long = "pkg")]
        pkg: Vec<String>,
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Run configure/make/install through packaging.
    Build {
        /// Resume: skip packages already recorded `ok`. Without this
        /// flag every targeted package is rebuilt from `configured`
        /// regardless of prior state.
        #[arg(long = "continue")]
        continue_: bool,
        /// Disable `strip --strip-unneeded` for this run.
        #[arg(long)]
        no_strip: bool,
        /// Override the configured retry count for configure/make/install.
        #[arg(long)]
        retry: Option<u32>,
        #[arg(long)]
        jobs: Option<usize>,
        /// Override the recipe's execution mode for every targeted
        /// package.
        #[arg(long)]
        mode: Option<ExecModeArg>,
        /// Package names; defaults to every recipe known to the Recipe
        /// Store.
        pkg: Vec<String>,
    },
    /// Apply a built package's artifact into a target root.
    Install {
        /// Resume: skip packages already recorded `ok` in install state.
        #[arg(long = "continue")]
        continue_: bool,
        /// Run only the verification predicate, without (re-)extracting.
        #[arg(long)]
        verify_only: bool,
        /// Report what would be installed without writing anything.
        #[arg(long)]
        dry_run: bool,
        /// Target root to install into; defaults to config `chroot_path`
        /// if set. Required, one way or another.
        #[arg(long)]
        root: Option<Utf8PathBuf>,
        #[arg(long)]
        jobs: Option<usize>,
        /// Package names; defaults to every recipe known to the Recipe
        /// Store.
        pkg: Vec<String>,
    },
    /// Inspect recipes without driving the pipeline.
    Recipe {
        #[command(subcommand)]
        action: RecipeAction,
    },
}

#[derive(Subcommand)]
pub enum RecipeAction {
    /// Print one recipe's metadata, sources, and dependency list.
    Show {
        /// Package name to show.
        name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecModeArg {
    Chroot,
    Fakeroot,
    Auto,
}

impl From<ExecModeArg> for lfsforge_config::ExecMode {
    fn from(mode: ExecModeArg) -> Self {
        match mode {
            ExecModeArg::Chroot => lfsforge_config::ExecMode::Chroot,
            ExecModeArg::Fakeroot => lfsforge_config::ExecMode::Fakeroot,
            ExecModeArg::Auto => lfsforge_config::ExecMode::Auto,
        }
    }
}
