//! Virtual-filesystem lifecycle for a chroot batch: bind
//! `/dev`, bind `/dev/pts`, `proc`, `sysfs`, and a `tmpfs` at `/run`,
//! recorded as a session stack and unwound in reverse order.

use camino::{Utf8Path, Utf8PathBuf};
use nix::mount::{mount, umount2, MntFlags, MsFlags};

use crate::error::IsolationError;

/// One entry of the mount plan. `source` is `None` for virtual
/// filesystems that have no host-side backing path (`proc`, `sysfs`,
/// `tmpfs`).
struct MountPlanEntry {
    source: Option<&'static str>,
    target_suffix: &'static str,
    fstype: Option<&'static str>,
    flags: MsFlags,
    data: Option<&'static str>,
}

const PLAN: &[MountPlanEntry] = &[
    MountPlanEntry {
        source: Some("/dev"),
        target_suffix: "dev",
        fstype: None,
        flags: MsFlags::MS_BIND,
        data: None,
    },
    MountPlanEntry {
        source: Some("/dev/pts"),
        target_suffix: "dev/pts",
        fstype: None,
        flags: MsFlags::MS_BIND,
        data: None,
    },
    MountPlanEntry {
        source: None,
        target_suffix: "proc",
        fstype: Some("proc"),
        flags: MsFlags::empty(),
        data: None,
    },
    MountPlanEntry {
        source: None,
        target_suffix: "sys",
        fstype: Some("sysfs"),
        flags: MsFlags::empty(),
        data: None,
    },
    MountPlanEntry {
        source: None,
        target_suffix: "run",
        fstype: Some("tmpfs"),
        flags: MsFlags::empty(),
        data: Some("mode=0755"),
    },
];

/// Per-mount-point flags applied *after* the initial bind mount, since
/// `nosuid`/`nodev`/`noexec` can't be combined with `MS_BIND` in a single
/// call on Linux — the kernel requires a bind-then-remount sequence.
fn post_bind_flags(target_suffix: &str) -> Option<MsFlags> {
    match target_suffix {
        "dev" => Some(MsFlags::MS_BIND | MsFlags::MS_REMOUNT | MsFlags::MS_NOSUID | MsFlags::MS_NODEV),
        "dev/pts" => {
            Some(MsFlags::MS_BIND | MsFlags::MS_REMOUNT | MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC)
        }
        _ => None,
    }
}

/// A mounted stack for one chroot session, unwound in LIFO order.
#[derive(Debug, Default)]
pub struct MountStack {
    mounted: Vec<Utf8PathBuf>,
}

impl MountStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts every entry in [`PLAN`] under `root`, recording each
    /// success so a partial failure can still unwind what succeeded.
    pub fn mount_all(&mut self, root: &Utf8Path) -> Result<(), IsolationError> {
        for entry in PLAN {
            let target = root.join(entry.target_suffix);
            std::fs::create_dir_all(&target)?;
            let target_str = target.to_string();

            mount(
                entry.source,
                target.as_std_path(),
                entry.fstype,
                entry.flags,
                entry.data,
            )
            .map_err(|errno| IsolationError::MountFailed {
                target: target_str.clone(),
                reason: errno.to_string(),
            })?;
            self.mounted.push(target.clone());

            if let Some(remount_flags) = post_bind_flags(entry.target_suffix) {
                mount(
                    None::<&str>,
                    target.as_std_path(),
                    None::<&str>,
                    remount_flags,
                    None::<&str>,
                )
                .map_err(|errno| IsolationError::MountFailed {
                    target: target_str,
                    reason: errno.to_string(),
                })?;
            }
        }
        Ok(())
    }

    /// Unwinds whatever is mounted, in reverse order. A process still
    /// holding a mount point blocks the unmount unless `force` is set, in
    /// which case a busy mount falls back to `MNT_DETACH` (lazy unmount)
    /// instead of failing outright.
    pub fn unwind(&mut self, force: bool) -> Result<(), IsolationError> {
        while let Some(target) = self.mounted.pop() {
            if let Err(errno) = umount2(target.as_std_path(), MntFlags::empty()) {
                if !force {
                    return Err(IsolationError::UnmountFailed {
                        target: target.to_string(),
                        reason: errno.to_string(),
                    });
                }
                // Busy with `force` set: fall back to lazy-unmount once.
                umount2(target.as_std_path(), MntFlags::MNT_DETACH).map_err(|errno| {
                    IsolationError::UnmountFailed {
                        target: target.to_string(),
                        reason: errno.to_string(),
                    }
                })?;
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }
}
