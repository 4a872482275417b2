//! Namespace identifiers of processes and persisted names

use std::fs;
use std::path::Path;

use nshold_core::{Error, NamespaceKind, NamespaceName, ProcessId, Result};

use crate::paths::{NamespacePaths, proc_namespace_path};

/// Identifiers (`net:[4026531905]` style) of the namespaces a holder keeps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceInfo {
    /// Mount namespace ID
    pub mnt: Option<String>,
    /// Network namespace ID
    pub net: Option<String>,
    /// IPC namespace ID
    pub ipc: Option<String>,
}

impl NamespaceInfo {
    /// Namespaces of the calling process
    ///
    /// # Errors
    /// Returns error if no namespace identifier can be read
    pub fn current() -> Result<Self> {
        Self::for_pid(ProcessId::current())
    }

    /// Namespaces of process `pid`
    ///
    /// # Errors
    /// Returns error if no namespace identifier can be read
    pub fn for_pid(pid: ProcessId) -> Result<Self> {
        let info = Self::collect(|kind| proc_namespace_path(pid, kind));
        if info.is_empty() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no namespaces readable for pid {pid}"),
            )));
        }
        Ok(info)
    }

    /// Namespaces behind the persisted handles of `name`
    ///
    /// Follows each link to the holder's `/proc` entry; kinds whose link is
    /// missing or dangling are left empty.
    #[must_use]
    pub fn for_name(paths: &NamespacePaths, name: &NamespaceName) -> Self {
        Self::collect(|kind| paths.namespace_path(name, kind))
    }

    fn collect(path_of: impl Fn(NamespaceKind) -> std::path::PathBuf) -> Self {
        Self {
            mnt: read_ns(&path_of(NamespaceKind::Mount)),
            net: read_ns(&path_of(NamespaceKind::Network)),
            ipc: read_ns(&path_of(NamespaceKind::Ipc)),
        }
    }

    /// Identifier for one kind
    #[must_use]
    pub fn get(&self, kind: NamespaceKind) -> Option<&str> {
        match kind {
            NamespaceKind::Mount => self.mnt.as_deref(),
            NamespaceKind::Network => self.net.as_deref(),
            NamespaceKind::Ipc => self.ipc.as_deref(),
        }
    }

    /// True when no identifier was read
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.mnt.is_none() && self.net.is_none() && self.ipc.is_none()
    }
}

const MAX_HOPS: usize = 8;

// Follows absolute links until the kernel's `type:[inode]` name shows up.
fn read_ns(path: &Path) -> Option<String> {
    let mut current = path.to_path_buf();
    for _ in 0..MAX_HOPS {
        let target = fs::read_link(&current).ok()?;
        if !target.is_absolute() {
            return Some(target.to_string_lossy().into_owned());
        }
        current = target;
    }
    None
}

impl std::fmt::Display for NamespaceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Namespace Info:")?;
        if let Some(ref mnt) = self.mnt {
            writeln!(f, "  MNT:    {mnt}")?;
        }
        if let Some(ref net) = self.net {
            writeln!(f, "  NET:    {net}")?;
        }
        if let Some(ref ipc) = self.ipc {
            writeln!(f, "  IPC:    {ipc}")?;
        }
        Ok(())
    }
}
