//! System client trait for pluggable implementations

use nix::mount::{MntFlags, MsFlags};
use nix::sched::CloneFlags;
use nix::sys::socket::{AddressFamily, SockProtocol, SockType};
use std::os::fd::{BorrowedFd, OwnedFd};
use std::path::Path;

use nshold_core::ProcessId;

/// Routine run by a cloned process; its return value is the exit status
pub type EntryFn = Box<dyn FnMut() -> i32 + Send>;

/// Trait for the system calls a namespace holder needs
///
/// This allows for different implementations:
/// - [`LinuxSysClient`](crate::LinuxSysClient) - Production, real syscalls
/// - [`MockSysClient`](crate::MockSysClient) - Testing without privileges
///
/// # Thread Safety
/// All implementations must be `Send + Sync` so one client can be shared
/// with the entry routine of a cloned process.
pub trait SysClient: Send + Sync {
    /// Mount `source` of type `fstype` on `target`
    fn mount(&self, source: &str, target: &Path, fstype: &str, flags: MsFlags) -> nix::Result<()>;

    /// Unmount `target`
    fn umount(&self, target: &Path, flags: MntFlags) -> nix::Result<()>;

    /// Open a socket
    fn socket(
        &self,
        domain: AddressFamily,
        ty: SockType,
        protocol: Option<SockProtocol>,
    ) -> nix::Result<OwnedFd>;

    /// Issue an ioctl with a plain integer argument
    fn ioctl(&self, fd: BorrowedFd<'_>, request: u64, arg: usize) -> nix::Result<i32>;

    /// Run `entry` in a new process created with the namespace `flags`
    ///
    /// The child starts with a copy of the caller's memory; `entry` never
    /// returns to the caller's code in the child.
    fn clone_process(&self, label: &str, entry: EntryFn, flags: CloneFlags)
    -> nix::Result<ProcessHandle>;

    /// Move the calling process into new namespaces of the given kinds
    fn unshare(&self, flags: CloneFlags) -> nix::Result<()>;

    /// Move the calling process into the namespace referred to by `fd`
    fn setns(&self, fd: BorrowedFd<'_>, nstype: CloneFlags) -> nix::Result<()>;
}

/// A process started by [`SysClient::clone_process`]
///
/// Holders are never waited on. Calling [`detach`](Self::detach) gives up
/// the handle and keeps only the pid; dropping the handle has no effect on
/// the process.
#[derive(Debug)]
#[must_use = "a process handle should be detached explicitly"]
pub struct ProcessHandle {
    pid: ProcessId,
    label: String,
}

impl ProcessHandle {
    /// Wrap a freshly cloned process
    pub fn new(pid: ProcessId, label: impl Into<String>) -> Self {
        Self {
            pid,
            label: label.into(),
        }
    }

    /// Process id
    #[must_use]
    pub const fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Label given at clone time
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Stop tracking the process and keep only its id
    #[must_use]
    pub fn detach(self) -> ProcessId {
        tracing::debug!(pid = self.pid.as_raw(), label = %self.label, "Detached from process");
        self.pid
    }
}
