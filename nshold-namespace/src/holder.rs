//! Holder processes that keep a namespace set alive
//!
//! A holder is cloned straight into fresh namespaces, replaces `/sys` with a
//! view of its own network namespace, optionally latches paranoid networking
//! and then parks forever. Its `/proc/<pid>/ns/*` entries are what the binder
//! links into the namespace directory.

use nix::mount::{MntFlags, MsFlags};
use nix::sched::CloneFlags;
use nix::sys::socket::{AddressFamily, SockType};
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsFd, OwnedFd};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

use nshold_core::{Error, NamespaceKind, NamespaceName, ProcessId, Report, Result, Step};
use nshold_sys::{EntryFn, ProcessHandle, SysClient};

use crate::config::ManagerConfig;

/// Private ioctl latching paranoid networking on the current network namespace
pub const SIOCSPARANOID: u64 = 0x89df;

/// Exit status of a holder whose setup failed
pub const SETUP_FAILED: i32 = 1;

const SYS_MOUNT_POINT: &str = "/sys";
const READY: u8 = b'R';

/// State a holder keeps while parked
#[derive(Debug, Default)]
pub struct PreparedHolder {
    /// Tolerated failures met during setup
    pub report: Report,
    /// Socket used for the paranoid latch, kept open for the holder's lifetime
    pub latch_socket: Option<OwnedFd>,
}

/// Set up the namespaces of the calling (holder) process
///
/// Mounts are first made slaves of the host's so nothing below propagates
/// back. `/sys` is then detached lazily and a fresh `sysfs` mounted in its
/// place, so tools that read `/sys` see this network namespace. All three
/// failures are fatal. The paranoid latch is best effort.
///
/// Making `/` a slave needs `/` to be a mount point; inside a plain chroot
/// the holder therefore fails its setup.
pub fn prepare_namespace(sys: &dyn SysClient, paranoid: bool) -> Result<PreparedHolder> {
    let sys_path = Path::new(SYS_MOUNT_POINT);

    sys.mount("none", Path::new("/"), "", MsFlags::MS_REC | MsFlags::MS_SLAVE)
        .map_err(|e| Error::HolderSetup {
            step: Step::IsolateMounts,
            source: e,
        })?;

    sys.umount(sys_path, MntFlags::MNT_DETACH)
        .map_err(|e| Error::HolderSetup {
            step: Step::DetachSys,
            source: e,
        })?;

    sys.mount("none", sys_path, "sysfs", MsFlags::empty())
        .map_err(|e| Error::HolderSetup {
            step: Step::MountSys,
            source: e,
        })?;

    let mut prepared = PreparedHolder::default();
    if paranoid {
        prepared.latch_socket = latch_paranoid(sys, &mut prepared.report);
    }

    Ok(prepared)
}

fn latch_paranoid(sys: &dyn SysClient, report: &mut Report) -> Option<OwnedFd> {
    let socket = match sys.socket(AddressFamily::Inet, SockType::Datagram, None) {
        Ok(socket) => socket,
        Err(e) => {
            report.record(Step::ParanoidSocket, e);
            return None;
        }
    };

    match sys.ioctl(socket.as_fd(), SIOCSPARANOID, 0) {
        Ok(_) => debug!("Paranoid networking enabled"),
        Err(e) => report.record(Step::ParanoidLatch, e),
    }

    Some(socket)
}

/// Entry routine of a holder process
///
/// Returns only when setup fails. On success it signals `ready` (when
/// given), leaves the parent's session and parks forever.
pub fn holder_main(sys: &dyn SysClient, paranoid: bool, ready: Option<File>) -> i32 {
    match prepare_namespace(sys, paranoid) {
        Ok(prepared) => {
            if let Some(mut ready) = ready {
                let _ = ready.write_all(&[READY]);
            }
            park(&prepared)
        }
        Err(e) => {
            error!(error = %e, "Holder setup failed");
            SETUP_FAILED
        }
    }
}

fn park(_prepared: &PreparedHolder) -> ! {
    let _ = nix::unistd::setsid();
    loop {
        nix::unistd::pause();
    }
}

/// Spawns holder processes into new namespaces
pub struct HolderLauncher {
    sys: Arc<dyn SysClient>,
    config: ManagerConfig,
}

impl HolderLauncher {
    /// Create a launcher using `sys` for every syscall
    #[must_use]
    pub fn new(sys: Arc<dyn SysClient>, config: &ManagerConfig) -> Self {
        Self {
            sys,
            config: config.clone(),
        }
    }

    /// Namespace flags requested for a holder
    ///
    /// A full set gives fresh mount, network and IPC namespaces; otherwise
    /// only the mount namespace is new and networking stays shared.
    #[must_use]
    pub fn clone_flags(new_namespace_set: bool) -> CloneFlags {
        if new_namespace_set {
            NamespaceKind::full_set()
        } else {
            NamespaceKind::Mount.clone_flag()
        }
    }

    /// Clone a holder for `name`
    ///
    /// The caller owns the returned handle and is expected to
    /// [`detach`](ProcessHandle::detach) it; holders are never waited on.
    /// Without the readiness handshake a failing holder setup only shows up
    /// later, when its namespaces cannot be opened.
    pub fn spawn(
        &self,
        name: &NamespaceName,
        new_namespace_set: bool,
        paranoid: bool,
    ) -> Result<ProcessHandle> {
        let flags = Self::clone_flags(new_namespace_set);
        let label = self.config.holder_label(name.as_str());

        let (reader, mut writer) = if self.config.wait_for_holder {
            let (reader, writer) = nix::unistd::pipe()?;
            (Some(File::from(reader)), Some(File::from(writer)))
        } else {
            (None, None)
        };

        let sys = Arc::clone(&self.sys);
        let entry: EntryFn = Box::new(move || holder_main(sys.as_ref(), paranoid, writer.take()));

        let handle = self
            .sys
            .clone_process(&label, entry, flags)
            .map_err(|e| {
                error!(name = %name, error = %e, "Failed to clone holder");
                Error::Spawn {
                    name: name.clone(),
                    source: e,
                }
            })?;

        info!(name = %name, pid = handle.pid().as_raw(), ?flags, "Holder spawned");

        if let Some(reader) = reader {
            wait_ready(reader, name, handle.pid())?;
        }

        Ok(handle)
    }
}

impl std::fmt::Debug for HolderLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HolderLauncher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn wait_ready(mut reader: File, name: &NamespaceName, pid: ProcessId) -> Result<()> {
    let mut buf = [0u8; 1];
    loop {
        match reader.read(&mut buf) {
            Ok(1) if buf[0] == READY => {
                debug!(name = %name, pid = pid.as_raw(), "Holder ready");
                return Ok(());
            }
            Ok(_) => {
                error!(name = %name, pid = pid.as_raw(), "Holder exited before it was ready");
                return Err(Error::HolderNotReady {
                    name: name.clone(),
                    pid,
                });
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
}
