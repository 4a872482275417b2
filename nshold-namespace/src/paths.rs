//! Mapping of namespace names to persisted files

use std::path::{Path, PathBuf};

use nshold_core::{NamespaceKind, NamespaceName, ProcessId};

/// Suffix of the file recording the holder pid
pub const PID_RECORD_SUFFIX: &str = "process";

/// Resolves persisted-namespace paths under a root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespacePaths {
    root: PathBuf,
}

impl NamespacePaths {
    /// Create a resolver rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<sanitized name>.<suffix>`
    ///
    /// Distinct names can resolve to the same path; no collision check is
    /// made.
    #[must_use]
    pub fn resolve(&self, name: &NamespaceName, suffix: &str) -> PathBuf {
        self.root.join(format!("{}.{suffix}", sanitize(name.as_str())))
    }

    /// Persisted handle for one namespace kind
    #[must_use]
    pub fn namespace_path(&self, name: &NamespaceName, kind: NamespaceKind) -> PathBuf {
        self.resolve(name, kind.tag())
    }

    /// File recording the holder pid
    #[must_use]
    pub fn pid_record_path(&self, name: &NamespaceName) -> PathBuf {
        self.resolve(name, PID_RECORD_SUFFIX)
    }
}

/// `/proc/<pid>/ns/<tag>` of a process
#[must_use]
pub fn proc_namespace_path(pid: ProcessId, kind: NamespaceKind) -> PathBuf {
    PathBuf::from(format!("/proc/{pid}/ns/{}", kind.tag()))
}

/// Replace every byte that is not an ASCII letter or digit with `_`
///
/// Works per byte, so a multi-byte character turns into one `_` per byte.
#[must_use]
pub fn sanitize(name: &str) -> String {
    name.bytes()
        .map(|b| if b.is_ascii_alphanumeric() { char::from(b) } else { '_' })
        .collect()
}
