//! The per-package state machine: `new -> locked ->
//! sources-fetched -> extracted -> patched -> configured -> built ->
//! installed -> stripped -> packaged -> done`, split across the three
//! CLI-visible checkpoints (`fetch`, `extract`, `build`) that each own a
//! [`StateStore`] phase group.

use std::time::Duration;

use lfsforge_config::ExecMode;
use lfsforge_core::{PhaseError, Status};
use lfsforge_lock::{Acquisition, LockKey};
use lfsforge_recipe::model::{Recipe, SourceEntry};
use lfsforge_runner::{destdir_has_artifacts, PhaseRunner};
use lfsforge_state::PackageState;

use crate::outcome::{StepError, StepOutcome};
use crate::package::PackageContext;
use crate::packaging;

/// Knobs a `build` invocation may override from the CLI, layered over
/// [`lfsforge_config::Config`]'s defaults.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub strip: bool,
    pub retries: u32,
    pub exec_mode_override: ExecMode,
    pub phase_timeout: Duration,
    /// Bypasses the "already `ok`" resume check (CLI `build` without
    /// `--continue`).
    pub force: bool,
}

impl BuildOptions {
    pub fn from_config(ctx: &PackageContext) -> Self {
        Self {
            strip: ctx.cfg.strip_binaries,
            retries: ctx.cfg.default_retries,
            exec_mode_override: ctx.cfg.exec_mode,
            phase_timeout: ctx.cfg.default_phase_timeout(),
            force: false,
        }
    }
}

/// Runs one package through one checkpoint at a time against a shared
/// [`PackageContext`]. Cheap to construct; the Scheduler builds one per
/// dispatched package.
pub struct Pipeline<'a> {
    ctx: &'a PackageContext,
}

impl<'a> Pipeline<'a> {
    pub fn new(ctx: &'a PackageContext) -> Self {
        Self { ctx }
    }

    /// `new -> locked -> sources-fetched`.
    pub fn fetch(&self, recipe: &Recipe, force: bool) -> Result<StepOutcome, StepError> {
        let key = LockKey::new("fetch", &recipe.name);
        let guard = match self.ctx.locks.try_acquire(&key).map_err(|e| StepError::Other(e.to_string()))? {
            Acquisition::Acquired(h) => h,
            Acquisition::Busy => return Ok(StepOutcome::Locked),
        };

        if !force {
            if let Some(state) = self
                .ctx
                .fetch_state
                .read(&recipe.name)
                .map_err(|e| StepError::Other(e.to_string()))?
            {
                if state.status == Status::Ok {
                    guard.release().ok();
                    return Ok(StepOutcome::AlreadySatisfied);
                }
            }
        }

        let result = self.fetch_locked(recipe);
        guard.release().ok();
        self.record(&self.ctx.fetch_state, &recipe.name, "fetch", &result);
        result
    }

    fn fetch_locked(&self, recipe: &Recipe) -> Result<StepOutcome, StepError> {
        if recipe.sources.is_empty() {
            let state = PackageState::new(&recipe.name, Status::Skipped, "fetch")
                .with_reason("no-sources-found");
            self.ctx
                .fetch_state
                .write(&recipe.name, &state)
                .map_err(|e| StepError::Other(e.to_string()))?;
            return Ok(StepOutcome::Skipped("no-sources-found".to_string()));
        }

        let cache_dir = self.ctx.layout.sources(&recipe.name);
        let mut sources = Vec::new();
        let mut commit = None;

        for entry in &recipe.sources {
            match entry {
                SourceEntry::Git {
                    git,
                    git_ref,
                    depth,
                    submodules,
                } => {
                    let outcome = lfsforge_fetch::fetch_git(
                        git,
                        &cache_dir,
                        git_ref.as_deref(),
                        *depth,
                        *submodules,
                    )?;
                    commit = Some(outcome.commit);
                }
                SourceEntry::Remote { .. } | SourceEntry::Inline(_) => {
                    let url = entry.url().expect("non-git source entry always has a url");
                    let filename = basename_of(url);
                    let outcome = lfsforge_fetch::fetch_url(
                        &self.ctx.http_client,
                        url,
                        &cache_dir,
                        &filename,
                        entry.checksum(),
                        entry.mirrors(),
                        &self.ctx.layout,
                    )?;
                    sources.push(lfsforge_state::model::SourceRecord {
                        url: url.to_string(),
                        sha256: outcome.verified_sha256,
                    });
                }
            }
        }

        let mut state = PackageState::new(&recipe.name, Status::Ok, "fetch");
        state.sources = sources;
        state.commit = commit;
        self.ctx
            .fetch_state
            .write(&recipe.name, &state)
            .map_err(|e| StepError::Other(e.to_string()))?;

        Ok(StepOutcome::Done)
    }

    /// `sources-fetched -> extracted -> patched`. `force`
    /// bypasses the "already `ok`" resume check (CLI `build`/`extract`
    /// without `--continue`).
    pub fn extract(&self, recipe: &Recipe, force: bool) -> Result<StepOutcome, StepError> {
        match self.ctx.fetch_state.read(&recipe.name).map_err(|e| StepError::Other(e.to_string()))? {
            Some(state) if state.status == Status::Ok => {}
            _ => {
                return Err(StepError::PrerequisiteUnmet(format!(
                    "{} has not completed fetch",
                    recipe.name
                )))
            }
        }

        let key = LockKey::new("extract", &recipe.name);
        let guard = match self.ctx.locks.try_acquire(&key).map_err(|e| StepError::Other(e.to_string()))? {
            Acquisition::Acquired(h) => h,
            Acquisition::Busy => return Ok(StepOutcome::Locked),
        };

        if !force {
            if let Some(state) = self
                .ctx
                .extract_state
                .read(&recipe.name)
                .map_err(|e| StepError::Other(e.to_string()))?
            {
                if state.status == Status::Ok {
                    guard.release().ok();
                    return Ok(StepOutcome::AlreadySatisfied);
                }
            }
        }

        let result = self.extract_locked(recipe);
        guard.release().ok();
        self.record(&self.ctx.extract_state, &recipe.name, "extract", &result);
        result
    }

    fn extract_locked(&self, recipe: &Recipe) -> Result<StepOutcome, StepError> {
        let result = self.extract_locked_inner(recipe);
        if result.is_err() {
            // Extraction/patch failure: quarantine whatever the failed
            // attempt left behind so a retry sees a clean workspace.
            let root = self.ctx.layout.workspace_root(&recipe.name);
            if let Err(e) = self.ctx.layout.corrupted_quarantine(&root) {
                tracing::warn!(pkg = %recipe.name, %e, "failed to quarantine workspace after extract/patch failure");
            }
        }
        result
    }

    fn extract_locked_inner(&self, recipe: &Recipe) -> Result<StepOutcome, StepError> {
        // Extraction is not incremental: every attempt
        // discards whatever workspace a previous attempt left behind.
        self.ctx
            .layout
            .scrub_workspace(&recipe.name)
            .map_err(|e| StepError::Other(e.to_string()))?;
        let ws = self
            .ctx
            .layout
            .workspace(&recipe.name)
            .map_err(|e| StepError::Other(e.to_string()))?;
        let cache_dir = self.ctx.layout.sources(&recipe.name);
        let hooks_dir = self.ctx.cfg.hooks_dir.clone();
        let env = recipe.environment_pairs();

        // `pre_extract` is documented to see the sources
        // cache directory, not the workspace.
        lfsforge_hooks::run_hook(
            "pre_extract",
            recipe.hooks.pre_extract.as_deref(),
            &cache_dir,
            &hooks_dir,
            &env,
            &self.ctx.layout.phase_log(&recipe.name, "pre_extract"),
        )?;

        let mut patches = Vec::new();
        for entry in &recipe.sources {
            match entry {
                SourceEntry::Git { .. } => {
                    copy_dir_recursive(cache_dir.as_std_path(), ws.src.as_std_path())
                        .map_err(StepError::Io)?;
                }
                SourceEntry::Remote { .. } | SourceEntry::Inline(_) => {
                    let Some(url) = entry.url() else { continue };
                    let filename = basename_of(url);
                    let cached = cache_dir.join(&filename);
                    if entry.is_patch() {
                        patches.push(cached);
                    } else {
                        lfsforge_extract::extract(&cached, &ws.src)?;
                    }
                }
            }
        }

        lfsforge_hooks::run_hook(
            "post_extract",
            recipe.hooks.post_extract.as_deref(),
            &ws.src,
            &hooks_dir,
            &env,
            &self.ctx.layout.phase_log(&recipe.name, "post_extract"),
        )?;

        lfsforge_extract::apply_patches(&ws.src, &patches)?;

        lfsforge_hooks::run_hook(
            "post_patch",
            recipe.hooks.post_patch.as_deref(),
            &ws.src,
            &hooks_dir,
            &env,
            &self.ctx.layout.phase_log(&recipe.name, "post_patch"),
        )?;

        let state = PackageState::new(&recipe.name, Status::Ok, "extract");
        self.ctx
            .extract_state
            .write(&recipe.name, &state)
            .map_err(|e| StepError::Other(e.to_string()))?;

        Ok(StepOutcome::Done)
    }

    /// `patched -> configured -> built -> installed -> stripped ->
    /// packaged`.
    pub fn build(&self, recipe: &Recipe, opts: &BuildOptions) -> Result<StepOutcome, StepError> {
        match self.ctx.extract_state.read(&recipe.name).map_err(|e| StepError::Other(e.to_string()))? {
            Some(state) if state.status == Status::Ok => {}
            _ => {
                return Err(StepError::PrerequisiteUnmet(format!(
                    "{} has not completed extract",
                    recipe.name
                )))
            }
        }

        let key = LockKey::new("build", &recipe.name);
        let guard = match self.ctx.locks.try_acquire(&key).map_err(|e| StepError::Other(e.to_string()))? {
            Acquisition::Acquired(h) => h,
            Acquisition::Busy => return Ok(StepOutcome::Locked),
        };

        if !opts.force {
            if let Some(state) = self
                .ctx
                .build_state
                .read(&recipe.name)
                .map_err(|e| StepError::Other(e.to_string()))?
            {
                if state.status == Status::Ok {
                    guard.release().ok();
                    return Ok(StepOutcome::AlreadySatisfied);
                }
            }
        }

        let result = self.build_locked(recipe, opts);
        guard.release().ok();
        self.record(&self.ctx.build_state, &recipe.name, "build", &result);
        result
    }

    fn build_locked(&self, recipe: &Recipe, opts: &BuildOptions) -> Result<StepOutcome, StepError> {
        let ws = self
            .ctx
            .layout
            .workspace(&recipe.name)
            .map_err(|e| StepError::Other(e.to_string()))?;
        let hooks_dir = self.ctx.cfg.hooks_dir.clone();
        let mut env = recipe.environment_pairs();
        if let Some(jobs) = recipe.build.parallel_jobs {
            env.push(("LFSFORGE_JOBS".to_string(), jobs.to_string()));
        }

        let runner = PhaseRunner::new(opts.phase_timeout, opts.retries, self.ctx.log_sink.clone());
        let recipe_mode = recipe.build.mode;
        let isolation = self.ctx.isolation.clone();
        let global_override = opts.exec_mode_override;
        let isolate = move |spec: lfsforge_runner::CommandSpec, script: &str| {
            isolation
                .wrap_phase(recipe_mode, global_override, spec, script)
                .map_err(|e| PhaseError::IsolationUnavailable {
                    requested: format!("{recipe_mode:?}"),
                    reason: e.to_string(),
                })
        };

        lfsforge_hooks::run_hook(
            "pre_build",
            recipe.hooks.pre_build.as_deref(),
            &ws.build,
            &hooks_dir,
            &env,
            &self.ctx.layout.phase_log(&recipe.name, "pre_build"),
        )?;

        if let Some(configure) = &recipe.build.configure {
            runner.run_phase_isolated(
                &recipe.name,
                "configure",
                configure,
                &ws.build,
                &env,
                PhaseError::ConfigureFailed,
                &isolate,
            )?;
        }

        if let Some(make) = &recipe.build.make {
            runner.run_phase_isolated(
                &recipe.name,
                "make",
                make,
                &ws.build,
                &env,
                PhaseError::MakeFailed,
                &isolate,
            )?;
        }

        lfsforge_hooks::run_hook(
            "post_build",
            recipe.hooks.post_build.as_deref(),
            &ws.build,
            &hooks_dir,
            &env,
            &self.ctx.layout.phase_log(&recipe.name, "post_build"),
        )?;

        lfsforge_hooks::run_hook(
            "pre_install",
            recipe.hooks.pre_install.as_deref(),
            &ws.build,
            &hooks_dir,
            &env,
            &self.ctx.layout.phase_log(&recipe.name, "pre_install"),
        )?;

        if let Some(install) = &recipe.build.install {
            let mut install_env = env.clone();
            install_env.push(("DESTDIR".to_string(), ws.destdir.to_string()));
            runner.run_phase_isolated(
                &recipe.name,
                "install",
                install,
                &ws.build,
                &install_env,
                PhaseError::InstallFailed,
                &isolate,
            )?;
        }

        if !destdir_has_artifacts(&ws.destdir).map_err(StepError::Io)? {
            return Err(PhaseError::SilentError {
                phase: "install".to_string(),
                pattern: "empty destdir: no regular file beyond .la/.pc found".to_string(),
            }
            .into());
        }

        lfsforge_hooks::run_hook(
            "post_install",
            recipe.hooks.post_install.as_deref(),
            &ws.build,
            &hooks_dir,
            &env,
            &self.ctx.layout.phase_log(&recipe.name, "post_install"),
        )?;

        let strip_enabled = recipe.strip.unwrap_or(opts.strip);
        if strip_enabled {
            if let Err(e) = packaging::strip_destdir(&ws.destdir) {
                tracing::warn!(pkg = %recipe.name, %e, "stripping destdir failed; continuing unstripped");
            }
            lfsforge_hooks::run_hook(
                "post_strip",
                recipe.hooks.post_strip.as_deref(),
                &ws.destdir,
                &hooks_dir,
                &env,
                &self.ctx.layout.phase_log(&recipe.name, "post_strip"),
            )?;
        }

        let artifact = packaging::package_destdir(
            &self.ctx.layout,
            &recipe.name,
            &recipe.version,
            &ws.destdir,
            self.ctx.cfg.package_archive_type,
        )?;

        let mut state = PackageState::new(&recipe.name, Status::Ok, "build");
        state.package_artifact = Some(lfsforge_state::model::PackageArtifact {
            path: artifact.path.to_string(),
            sha256: artifact.sha256,
        });
        self.ctx
            .build_state
            .write(&recipe.name, &state)
            .map_err(|e| StepError::Other(e.to_string()))?;

        Ok(StepOutcome::Done)
    }

    fn record(
        &self,
        store: &lfsforge_state::StateStore,
        pkg: &str,
        phase: &str,
        result: &Result<StepOutcome, StepError>,
    ) {
        if let Err(e) = result {
            let state = PackageState::new(pkg, Status::Failed, phase).with_reason(e.to_string());
            let _ = store.write(pkg, &state);
        }
    }
}

fn basename_of(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

fn copy_dir_recursive(src: &std::path::Path, dst: &std::path::Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let dest_path = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            if entry.file_name() == ".git" {
                continue;
            }
            copy_dir_recursive(&entry.path(), &dest_path)?;
        } else {
            std::fs::copy(entry.path(), dest_path)?;
        }
    }
    Ok(())
}
