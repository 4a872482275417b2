//! Persisting a holder's namespaces under their name

use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, symlink};
use std::path::Path;
use tracing::{debug, error, info};

use nshold_core::{Error, NamespaceKind, NamespaceName, ProcessId, Report, Result, Step};

use crate::paths::{NamespacePaths, proc_namespace_path};

/// Mode of the pid record file
pub const PID_RECORD_MODE: u32 = 0o644;

/// Links holder namespaces into the namespace directory
#[derive(Debug, Clone)]
pub struct NamespaceBinder {
    paths: NamespacePaths,
}

impl NamespaceBinder {
    /// Create a binder writing under `paths`
    #[must_use]
    pub const fn new(paths: NamespacePaths) -> Self {
        Self { paths }
    }

    /// Persist the namespaces of `holder` as `name`
    ///
    /// Each kind is linked to `/proc/<holder>/ns/<kind>`; a failed link is
    /// recorded and the remaining kinds are still attempted. The pid record
    /// is then created exclusively, so an existing record means the name is
    /// taken and the whole operation fails. Links and the holder are left in
    /// place on failure.
    pub fn persist(&self, name: &NamespaceName, holder: ProcessId) -> Result<Report> {
        let mut report = Report::new();

        for kind in NamespaceKind::ALL {
            let source = proc_namespace_path(holder, kind);
            let dest = self.paths.namespace_path(name, kind);

            match symlink(&source, &dest) {
                Ok(()) => debug!(
                    source = %source.display(),
                    dest = %dest.display(),
                    "Linked namespace"
                ),
                Err(e) => report.record(
                    Step::Symlink(kind),
                    format!("{} -> {}: {e}", source.display(), dest.display()),
                ),
            }
        }

        self.write_pid_record(name, holder)?;

        info!(name = %name, pid = holder.as_raw(), degraded = report.is_degraded(), "Namespace persisted");
        Ok(report)
    }

    fn write_pid_record(&self, name: &NamespaceName, holder: ProcessId) -> Result<()> {
        let path = self.paths.pid_record_path(name);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .mode(PID_RECORD_MODE)
            .open(&path)
            .map_err(|e| {
                error!(path = %path.display(), error = %e, "Failed to create pid record");
                Error::PidRecord {
                    path: path.clone(),
                    source: e,
                }
            })?;

        write_record(&mut file, &path, holder)
    }
}

// A single write; anything short of the full record is fatal.
fn write_record(out: &mut impl Write, path: &Path, holder: ProcessId) -> Result<()> {
    let contents = holder.to_string();
    let written = out.write(contents.as_bytes()).map_err(|e| Error::PidRecord {
        path: path.to_path_buf(),
        source: e,
    })?;

    if written != contents.len() {
        error!(path = %path.display(), written, "Short write to pid record");
        return Err(Error::ShortWrite {
            path: path.to_path_buf(),
            written,
            expected: contents.len(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nshold_core::Severity;
    use std::path::PathBuf;

    fn binder(root: &std::path::Path) -> NamespaceBinder {
        NamespaceBinder::new(NamespacePaths::new(root))
    }

    #[test]
    fn test_persist_links_every_kind() {
        let tmp = tempfile::tempdir().unwrap();
        let name = NamespaceName::new("dev1");

        let report = binder(tmp.path())
            .persist(&name, ProcessId::from_raw(1234))
            .unwrap();
        assert!(report.is_clean());

        for kind in NamespaceKind::ALL {
            let link = tmp.path().join(format!("dev1.{}", kind.tag()));
            assert_eq!(
                std::fs::read_link(&link).unwrap(),
                PathBuf::from(format!("/proc/1234/ns/{}", kind.tag()))
            );
        }

        let pid = std::fs::read_to_string(tmp.path().join("dev1.process")).unwrap();
        assert_eq!(pid, "1234");
    }

    #[test]
    fn test_existing_link_degrades_but_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("dev1.net"), b"").unwrap();

        let report = binder(tmp.path())
            .persist(&NamespaceName::new("dev1"), ProcessId::from_raw(55))
            .unwrap();

        assert!(report.is_degraded());
        assert!(report.tolerated(Step::Symlink(NamespaceKind::Network)));
        assert!(!report.tolerated(Step::Symlink(NamespaceKind::Mount)));
        assert!(tmp.path().join("dev1.ipc").is_symlink());
    }

    #[test]
    fn test_existing_pid_record_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("dev1.process"), b"1").unwrap();

        let err = binder(tmp.path())
            .persist(&NamespaceName::new("dev1"), ProcessId::from_raw(55))
            .unwrap_err();

        assert!(matches!(err, Error::PidRecord { .. }));
        assert_eq!(err.step(), Some(Step::PidRecord));
        // Links made before the failure stay behind
        assert!(tmp.path().join("dev1.mnt").is_symlink());
    }

    #[test]
    fn test_sanitized_name_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        binder(tmp.path())
            .persist(&NamespaceName::new("cvd-1"), ProcessId::from_raw(7))
            .unwrap();

        assert!(tmp.path().join("cvd_1.net").is_symlink());
        assert!(tmp.path().join("cvd_1.process").is_file());
    }

    struct Truncating(usize);

    impl Write for Truncating {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len().min(self.0))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_short_write_is_fatal() {
        let path = std::path::Path::new("/var/run/netns/dev1.process");

        let err = write_record(&mut Truncating(2), path, ProcessId::from_raw(12345)).unwrap_err();

        assert!(matches!(
            err,
            Error::ShortWrite {
                written: 2,
                expected: 5,
                ..
            }
        ));
        assert_eq!(err.step().map(Step::severity), Some(Severity::Fatal));
    }

    #[test]
    fn test_full_write_is_accepted() {
        let mut out = Vec::new();
        write_record(&mut out, std::path::Path::new("dev1.process"), ProcessId::from_raw(42)).unwrap();
        assert_eq!(out, b"42");
    }

    #[test]
    fn test_missing_root_fails_on_pid_record() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("absent");

        let err = binder(&root)
            .persist(&NamespaceName::new("dev1"), ProcessId::from_raw(7))
            .unwrap_err();
        assert!(matches!(err, Error::PidRecord { .. }));
    }
}
