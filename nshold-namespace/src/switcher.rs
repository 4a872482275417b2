//! Moving the calling process into a persisted namespace set

use std::os::fd::AsFd;
use tracing::{debug, info};

use nshold_core::{Error, NamespaceKind, NamespaceName, Report, Result, Step};
use nshold_sys::SysClient;

use crate::accessor::open_namespace;
use crate::paths::NamespacePaths;

/// Enter every namespace of `name`, in mount, network, IPC order
///
/// The caller first leaves its shared mount namespace; a failure there is
/// recorded and ignored. The first failing kind stops the switch and
/// nothing is rolled back: the returned [`Error::PartialSwitch`] lists the
/// kinds already entered.
///
/// Entering a mount namespace requires a single-threaded caller.
pub fn switch_namespace(
    sys: &dyn SysClient,
    paths: &NamespacePaths,
    name: &NamespaceName,
) -> Result<Report> {
    let mut report = Report::new();

    if let Err(e) = sys.unshare(NamespaceKind::Mount.clone_flag()) {
        report.record(Step::Unshare, e);
    }

    let mut switched = Vec::with_capacity(NamespaceKind::ALL.len());
    for kind in NamespaceKind::ALL {
        if let Err(e) = enter(sys, paths, name, kind) {
            return Err(Error::PartialSwitch {
                name: name.clone(),
                switched,
                source: Box::new(e),
            });
        }
        switched.push(kind);
    }

    info!(name = %name, "Switched namespaces");
    Ok(report)
}

fn enter(
    sys: &dyn SysClient,
    paths: &NamespacePaths,
    name: &NamespaceName,
    kind: NamespaceKind,
) -> Result<()> {
    let fd = open_namespace(paths, name, kind)?;

    sys.setns(fd.as_fd(), kind.clone_flag())
        .map_err(|e| {
            tracing::error!(name = %name, %kind, error = %e, "Could not change namespace");
            Error::SetNs {
                name: name.clone(),
                kind,
                source: e,
            }
        })?;

    debug!(name = %name, %kind, "Entered namespace");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::errno::Errno;
    use nix::sched::CloneFlags;
    use nshold_sys::{MockSysClient, SysCall, SysOp};
    use std::os::unix::fs::symlink;
    use std::path::Path;

    fn link_all(root: &Path, stem: &str) {
        for kind in NamespaceKind::ALL {
            symlink(
                format!("/proc/self/ns/{}", kind.tag()),
                root.join(format!("{stem}.{}", kind.tag())),
            )
            .unwrap();
        }
    }

    #[test]
    fn test_switch_enters_all_kinds_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        link_all(tmp.path(), "dev1");
        let sys = MockSysClient::new();

        let report = switch_namespace(&sys, &NamespacePaths::new(tmp.path()), &"dev1".into()).unwrap();
        assert!(report.is_clean());

        let calls = sys.calls();
        assert_eq!(calls[0], SysCall::Unshare { flags: CloneFlags::CLONE_NEWNS });

        let nstypes: Vec<CloneFlags> = calls[1..]
            .iter()
            .filter_map(|c| match c {
                SysCall::SetNs { nstype, .. } => Some(*nstype),
                _ => None,
            })
            .collect();
        assert_eq!(
            nstypes,
            vec![CloneFlags::CLONE_NEWNS, CloneFlags::CLONE_NEWNET, CloneFlags::CLONE_NEWIPC]
        );
    }

    #[test]
    fn test_unshare_failure_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        link_all(tmp.path(), "dev1");
        let sys = MockSysClient::new();
        sys.fail(SysOp::Unshare, Errno::EPERM);

        let report = switch_namespace(&sys, &NamespacePaths::new(tmp.path()), &"dev1".into()).unwrap();
        assert!(report.tolerated(Step::Unshare));
        assert_eq!(sys.call_count(SysOp::SetNs), 3);
    }

    #[test]
    fn test_unknown_name_switches_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let sys = MockSysClient::new();

        let err = switch_namespace(&sys, &NamespacePaths::new(tmp.path()), &"nonexistent".into())
            .unwrap_err();

        assert!(err.is_not_found());
        match err {
            Error::PartialSwitch { switched, .. } => assert!(switched.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sys.call_count(SysOp::SetNs), 0);
    }

    #[test]
    fn test_missing_kind_leaves_partial_switch() {
        let tmp = tempfile::tempdir().unwrap();
        symlink("/proc/self/ns/mnt", tmp.path().join("half.mnt")).unwrap();
        let sys = MockSysClient::new();

        let err = switch_namespace(&sys, &NamespacePaths::new(tmp.path()), &"half".into())
            .unwrap_err();

        assert_eq!(err.step(), Some(Step::Open(NamespaceKind::Network)));
        match err {
            Error::PartialSwitch { switched, .. } => {
                assert_eq!(switched, vec![NamespaceKind::Mount]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sys.call_count(SysOp::SetNs), 1);
    }

    #[test]
    fn test_setns_failure_stops_switch() {
        let tmp = tempfile::tempdir().unwrap();
        link_all(tmp.path(), "dev1");
        let sys = MockSysClient::new();
        sys.fail_after(SysOp::SetNs, 2, Errno::EINVAL);

        let err = switch_namespace(&sys, &NamespacePaths::new(tmp.path()), &"dev1".into())
            .unwrap_err();

        assert_eq!(err.step(), Some(Step::SetNs(NamespaceKind::Ipc)));
        match err {
            Error::PartialSwitch { switched, .. } => {
                assert_eq!(switched, vec![NamespaceKind::Mount, NamespaceKind::Network]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
