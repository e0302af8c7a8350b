//! Wiring shared by every pipeline step for one run: the FS layout, lock
//! registry, one [`StateStore`] per phase group, the log sink, and the
//! isolation manager. One [`PackageContext`] is built per CLI invocation
//! and shared (behind `Arc`) across the Scheduler's worker threads.

use std::sync::Arc;

use lfsforge_config::Config;
use lfsforge_core::{LogSink, TracingLogSink};
use lfsforge_fslayout::FsLayout;
use lfsforge_isolation::IsolationManager;
use lfsforge_lock::LockRegistry;
use lfsforge_state::{PhaseGroup, StateStore};

pub struct PackageContext {
    pub cfg: Config,
    pub layout: FsLayout,
    pub locks: Arc<LockRegistry>,
    pub fetch_state: StateStore,
    pub extract_state: StateStore,
    pub build_state: StateStore,
    pub log_sink: Arc<dyn LogSink>,
    pub isolation: Arc<IsolationManager>,
    pub http_client: reqwest::blocking::Client,
}

impl PackageContext {
    pub fn new(cfg: Config) -> anyhow::Result<Self> {
        let layout = FsLayout::new(cfg.clone());
        layout.ensure()?;
        let locks = Arc::new(LockRegistry::new(layout.clone()));

        let log_sink: Arc<dyn LogSink> = Arc::new(TracingLogSink::new(cfg.logs_dir()));
        let isolation = Arc::new(IsolationManager::new(
            locks.clone(),
            cfg.chroot_path.clone(),
        ));
        let http_client = reqwest::blocking::Client::builder()
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Ok(Self {
            fetch_state: StateStore::new(layout.clone(), (*locks).clone(), PhaseGroup::Fetch),
            extract_state: StateStore::new(layout.clone(), (*locks).clone(), PhaseGroup::Extract),
            build_state: StateStore::new(layout.clone(), (*locks).clone(), PhaseGroup::Build),
            layout,
            locks,
            log_sink,
            isolation,
            http_client,
            cfg,
        })
    }
}
