//! Recording system client for tests

use nix::errno::Errno;
use nix::mount::{MntFlags, MsFlags};
use nix::sched::CloneFlags;
use nix::sys::socket::{AddressFamily, SockProtocol, SockType};
use std::collections::HashMap;
use std::fs::File;
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nshold_core::ProcessId;

use crate::client::{EntryFn, ProcessHandle, SysClient};

/// Operations a [`MockSysClient`] can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysOp {
    /// `mount`
    Mount,
    /// `umount`
    Umount,
    /// `socket`
    Socket,
    /// `ioctl`
    Ioctl,
    /// `clone`
    Clone,
    /// `unshare`
    Unshare,
    /// `setns`
    SetNs,
}

/// A call observed by [`MockSysClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysCall {
    /// `mount(source, target, fstype, flags)`
    Mount {
        /// Mount source
        source: String,
        /// Mount point
        target: PathBuf,
        /// Filesystem type
        fstype: String,
        /// Mount flags
        flags: MsFlags,
    },
    /// `umount(target, flags)`
    Umount {
        /// Mount point
        target: PathBuf,
        /// Unmount flags
        flags: MntFlags,
    },
    /// `socket(domain, ty, protocol)`
    Socket {
        /// Address family
        domain: AddressFamily,
        /// Socket type
        ty: SockType,
    },
    /// `ioctl(fd, request, arg)`
    Ioctl {
        /// Request code
        request: u64,
        /// Argument
        arg: usize,
    },
    /// `clone(label, entry, flags)`
    Clone {
        /// Process label
        label: String,
        /// Namespace flags
        flags: CloneFlags,
    },
    /// `unshare(flags)`
    Unshare {
        /// Namespace flags
        flags: CloneFlags,
    },
    /// `setns(fd, nstype)`
    SetNs {
        /// File the descriptor refers to, when it could be resolved
        target: Option<PathBuf>,
        /// Namespace type
        nstype: CloneFlags,
    },
}

/// Mock client for testing (never touches namespaces or mounts)
///
/// Calls are recorded in order. `clone_process` drops the entry routine
/// without running it and reports a configurable pid, which defaults to the
/// calling process so `/proc/<pid>/ns/*` resolves to real handles.
///
/// # Example
/// ```
/// use nix::errno::Errno;
/// use nix::sched::CloneFlags;
/// use nshold_sys::{MockSysClient, SysClient, SysOp};
///
/// let sys = MockSysClient::new();
/// sys.fail(SysOp::Unshare, Errno::EPERM);
///
/// assert_eq!(sys.unshare(CloneFlags::CLONE_NEWNS), Err(Errno::EPERM));
/// assert_eq!(sys.calls().len(), 1);
/// ```
#[derive(Clone)]
pub struct MockSysClient {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    calls: Vec<SysCall>,
    clone_pid: Option<ProcessId>,
    failures: HashMap<SysOp, FailureRule>,
    seen: HashMap<SysOp, usize>,
}

#[derive(Clone, Copy)]
struct FailureRule {
    succeed_first: usize,
    errno: Errno,
}

impl MockSysClient {
    /// Create a new mock client
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Report `pid` for every cloned process
    #[must_use]
    pub fn with_clone_pid(self, pid: ProcessId) -> Self {
        self.lock().clone_pid = Some(pid);
        self
    }

    /// Make every call of `op` fail with `errno`
    pub fn fail(&self, op: SysOp, errno: Errno) {
        self.fail_after(op, 0, errno);
    }

    /// Let the first `successes` calls of `op` pass, then fail with `errno`
    pub fn fail_after(&self, op: SysOp, successes: usize, errno: Errno) {
        self.lock().failures.insert(
            op,
            FailureRule {
                succeed_first: successes,
                errno,
            },
        );
    }

    /// All calls recorded so far
    #[must_use]
    pub fn calls(&self) -> Vec<SysCall> {
        self.lock().calls.clone()
    }

    /// Number of calls made to `op`, including failed ones
    #[must_use]
    pub fn call_count(&self, op: SysOp) -> usize {
        self.lock().seen.get(&op).copied().unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observe(&self, op: SysOp, call: SysCall) -> nix::Result<()> {
        let mut state = self.lock();
        state.calls.push(call);

        let seen = state.seen.entry(op).or_insert(0);
        *seen += 1;
        let nth = *seen;

        match state.failures.get(&op) {
            Some(rule) if nth > rule.succeed_first => {
                tracing::debug!(?op, errno = %rule.errno, "Mock: Injected failure");
                Err(rule.errno)
            }
            _ => Ok(()),
        }
    }
}

impl Default for MockSysClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockSysClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSysClient").finish_non_exhaustive()
    }
}

impl SysClient for MockSysClient {
    fn mount(&self, source: &str, target: &Path, fstype: &str, flags: MsFlags) -> nix::Result<()> {
        self.observe(
            SysOp::Mount,
            SysCall::Mount {
                source: source.to_string(),
                target: target.to_path_buf(),
                fstype: fstype.to_string(),
                flags,
            },
        )
    }

    fn umount(&self, target: &Path, flags: MntFlags) -> nix::Result<()> {
        self.observe(
            SysOp::Umount,
            SysCall::Umount {
                target: target.to_path_buf(),
                flags,
            },
        )
    }

    fn socket(
        &self,
        domain: AddressFamily,
        ty: SockType,
        _protocol: Option<SockProtocol>,
    ) -> nix::Result<OwnedFd> {
        self.observe(SysOp::Socket, SysCall::Socket { domain, ty })?;

        // Any real descriptor will do.
        File::open("/dev/null")
            .map(OwnedFd::from)
            .map_err(|e| Errno::from_raw(e.raw_os_error().unwrap_or(libc::EIO)))
    }

    fn ioctl(&self, _fd: BorrowedFd<'_>, request: u64, arg: usize) -> nix::Result<i32> {
        self.observe(SysOp::Ioctl, SysCall::Ioctl { request, arg })?;
        Ok(0)
    }

    fn clone_process(
        &self,
        label: &str,
        entry: EntryFn,
        flags: CloneFlags,
    ) -> nix::Result<ProcessHandle> {
        self.observe(
            SysOp::Clone,
            SysCall::Clone {
                label: label.to_string(),
                flags,
            },
        )?;
        drop(entry);

        let pid = self.lock().clone_pid.unwrap_or_else(ProcessId::current);
        tracing::debug!(pid = pid.as_raw(), label, "Mock: Cloned process");
        Ok(ProcessHandle::new(pid, label))
    }

    fn unshare(&self, flags: CloneFlags) -> nix::Result<()> {
        self.observe(SysOp::Unshare, SysCall::Unshare { flags })
    }

    fn setns(&self, fd: BorrowedFd<'_>, nstype: CloneFlags) -> nix::Result<()> {
        let target = std::fs::read_link(format!("/proc/self/fd/{}", fd.as_raw_fd())).ok();
        self.observe(SysOp::SetNs, SysCall::SetNs { target, nstype })
    }
}
