//! Production system client backed by real Linux syscalls
//!
//! `clone_process` uses `unsafe` for clone(2), which is inherently unsafe
//! but necessary to start a process directly inside new namespaces.

#![allow(unsafe_code)]

use nix::errno::Errno;
use nix::mount::{MntFlags, MsFlags, mount, umount2};
use nix::sched::{CloneCb, CloneFlags};
use nix::sys::signal::Signal;
use nix::sys::socket::{AddressFamily, SockFlag, SockProtocol, SockType, socket};
use std::ffi::CString;
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd};
use std::path::Path;
use tracing::debug;

use nshold_core::ProcessId;

use crate::client::{EntryFn, ProcessHandle, SysClient};

/// Default stack size handed to cloned processes
pub const DEFAULT_STACK_SIZE: usize = 1024 * 1024;

/// System client issuing real syscalls
#[derive(Debug, Clone)]
pub struct LinuxSysClient {
    stack_size: usize,
}

impl LinuxSysClient {
    /// Create a client with the default clone stack size
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }

    /// Override the stack size used for cloned processes
    #[must_use]
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }
}

impl Default for LinuxSysClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SysClient for LinuxSysClient {
    fn mount(&self, source: &str, target: &Path, fstype: &str, flags: MsFlags) -> nix::Result<()> {
        debug!(source, target = %target.display(), fstype, "mount");
        mount(Some(source), target, Some(fstype), flags, None::<&str>)
    }

    fn umount(&self, target: &Path, flags: MntFlags) -> nix::Result<()> {
        debug!(target = %target.display(), ?flags, "umount");
        umount2(target, flags)
    }

    fn socket(
        &self,
        domain: AddressFamily,
        ty: SockType,
        protocol: Option<SockProtocol>,
    ) -> nix::Result<OwnedFd> {
        socket(domain, ty, SockFlag::empty(), protocol)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn ioctl(&self, fd: BorrowedFd<'_>, request: u64, arg: usize) -> nix::Result<i32> {
        let res = unsafe { libc::ioctl(fd.as_raw_fd(), request as libc::Ioctl, arg) };
        Errno::result(res)
    }

    fn clone_process(
        &self,
        label: &str,
        mut entry: EntryFn,
        flags: CloneFlags,
    ) -> nix::Result<ProcessHandle> {
        let comm = CString::new(label).map_err(|_| Errno::EINVAL)?;

        // Runs in the child: name it after the label, then hand over.
        let callback: CloneCb<'_> = Box::new(move || {
            let _ = nix::sys::prctl::set_name(&comm);
            entry() as isize
        });

        let mut stack = vec![0u8; self.stack_size];
        let pid = unsafe {
            nix::sched::clone(callback, &mut stack, flags, Some(Signal::SIGCHLD as i32))
        }?;

        debug!(pid = pid.as_raw(), label, ?flags, "Cloned process");
        Ok(ProcessHandle::new(ProcessId::from(pid), label))
    }

    fn unshare(&self, flags: CloneFlags) -> nix::Result<()> {
        debug!(?flags, "unshare");
        nix::sched::unshare(flags)
    }

    fn setns(&self, fd: BorrowedFd<'_>, nstype: CloneFlags) -> nix::Result<()> {
        debug!(fd = fd.as_raw_fd(), ?nstype, "setns");
        nix::sched::setns(fd, nstype)
    }
}
