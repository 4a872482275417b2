use std::os::fd::AsRawFd;
use std::sync::Arc;

use nix::errno::Errno;
use nshold_namespace::*;
use nshold_sys::{LinuxSysClient, MockSysClient, SysOp};

/// Check if running as root
fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

fn mock_manager(sys: &MockSysClient, root: &std::path::Path) -> NetworkNamespaceManager {
    NetworkNamespaceManager::new(Arc::new(sys.clone()), ManagerConfig::new().with_root(root))
        .unwrap()
}

#[test]
fn test_resolve_is_pure() {
    let paths = NamespacePaths::new("/var/run/netns");
    let name = NamespaceName::new("cvd-1@host");

    let first = paths.namespace_path(&name, NamespaceKind::Network);
    let second = paths.namespace_path(&name, NamespaceKind::Network);
    assert_eq!(first, second);
    assert_eq!(first.to_str(), Some("/var/run/netns/cvd_1_host.net"));
}

#[test]
fn test_punctuation_collision_is_accepted() {
    let paths = NamespacePaths::new("/var/run/netns");

    let a = paths.pid_record_path(&NamespaceName::new("dev_1"));
    let b = paths.pid_record_path(&NamespaceName::new("dev:1"));
    assert_eq!(a, b);
}

#[test]
fn test_create_then_get_descriptor() {
    let tmp = tempfile::tempdir().unwrap();
    let sys = MockSysClient::new();
    let manager = mock_manager(&sys, tmp.path());
    let name = NamespaceName::new("dev1");

    manager.create_network_namespace(&name, true, false).unwrap();

    let fd = manager.namespace_descriptor(&name).unwrap();
    assert!(fd.as_raw_fd() >= 0);
}

#[test]
fn test_second_create_fails_on_pid_record() {
    let tmp = tempfile::tempdir().unwrap();
    let sys = MockSysClient::new();
    let manager = mock_manager(&sys, tmp.path());
    let name = NamespaceName::new("dev1");

    let first = manager.create_network_namespace(&name, true, false).unwrap();
    assert!(first.report.is_clean());

    let err = manager
        .create_network_namespace(&name, true, false)
        .unwrap_err();
    assert!(matches!(err, Error::PidRecord { .. }));
    assert_eq!(err.step().map(Step::severity), Some(Severity::Fatal));
}

#[test]
fn test_colliding_names_share_a_pid_record() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = mock_manager(&MockSysClient::new(), tmp.path());

    manager
        .create_network_namespace(&NamespaceName::new("dev-1"), true, false)
        .unwrap();
    let err = manager
        .create_network_namespace(&NamespaceName::new("dev.1"), true, false)
        .unwrap_err();
    assert_eq!(err.step(), Some(Step::PidRecord));
}

#[test]
fn test_create_name_with_nul() {
    let tmp = tempfile::tempdir().unwrap();
    let sys = MockSysClient::new();
    let manager = mock_manager(&sys, tmp.path());
    let name = NamespaceName::new("dev\0one");

    let created = manager.create_network_namespace(&name, true, false).unwrap();
    assert!(created.report.is_clean());
    assert!(tmp.path().join("dev_one.process").is_file());
    assert!(manager.namespace_descriptor(&name).is_ok());

    assert!(sys.calls().contains(&nshold_sys::SysCall::Clone {
        label: "nshold.ns.dev".to_string(),
        flags: NamespaceKind::full_set(),
    }));
}

#[test]
fn test_mount_only_holder() {
    let tmp = tempfile::tempdir().unwrap();
    let sys = MockSysClient::new();
    let manager = mock_manager(&sys, tmp.path());

    manager
        .create_network_namespace(&NamespaceName::new(OUTER_NAMESPACE), false, false)
        .unwrap();

    assert!(sys.calls().contains(&nshold_sys::SysCall::Clone {
        label: "nshold.ns.outer".to_string(),
        flags: nix::sched::CloneFlags::CLONE_NEWNS,
    }));
}

#[test]
fn test_switch_after_create() {
    let tmp = tempfile::tempdir().unwrap();
    let sys = MockSysClient::new();
    let manager = mock_manager(&sys, tmp.path());
    let name = NamespaceName::new(ANDROID_NAMESPACE);

    manager.create_network_namespace(&name, true, false).unwrap();
    let report = manager.switch_namespace(&name).unwrap();

    assert!(report.is_clean());
    assert_eq!(sys.call_count(SysOp::Unshare), 1);
    assert_eq!(sys.call_count(SysOp::SetNs), 3);
}

#[test]
fn test_switch_nonexistent_reports_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let sys = MockSysClient::new();
    let manager = mock_manager(&sys, tmp.path());

    let err = manager
        .switch_namespace(&NamespaceName::new("nonexistent"))
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("not found"));
    match err {
        Error::PartialSwitch { switched, .. } => assert!(switched.is_empty()),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sys.call_count(SysOp::SetNs), 0);
}

#[test]
fn test_switch_keeps_partial_state() {
    let tmp = tempfile::tempdir().unwrap();
    let sys = MockSysClient::new();
    let manager = mock_manager(&sys, tmp.path());
    let name = NamespaceName::new("dev1");

    manager.create_network_namespace(&name, true, false).unwrap();
    std::fs::remove_file(manager.paths().namespace_path(&name, NamespaceKind::Ipc)).unwrap();

    let err = manager.switch_namespace(&name).unwrap_err();
    match err {
        Error::PartialSwitch { switched, source, .. } => {
            assert_eq!(switched, vec![NamespaceKind::Mount, NamespaceKind::Network]);
            assert!(source.is_not_found());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_switch_setns_failure_after_mount() {
    let tmp = tempfile::tempdir().unwrap();
    let sys = MockSysClient::new();
    sys.fail_after(SysOp::SetNs, 1, Errno::EPERM);
    let manager = mock_manager(&sys, tmp.path());
    let name = NamespaceName::new("dev1");

    manager.create_network_namespace(&name, true, false).unwrap();
    let err = manager.switch_namespace(&name).unwrap_err();

    assert_eq!(err.step(), Some(Step::SetNs(NamespaceKind::Network)));
}

#[test]
fn test_descriptor_for_never_created_name() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = mock_manager(&MockSysClient::new(), tmp.path());

    let err = manager
        .namespace_descriptor(&NamespaceName::new("never"))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_dead_holder_leaves_stale_handles() {
    let tmp = tempfile::tempdir().unwrap();
    // Pid 0 never has a /proc entry
    let sys = MockSysClient::new().with_clone_pid(ProcessId::from_raw(0));
    let manager = mock_manager(&sys, tmp.path());
    let name = NamespaceName::new("stale");

    manager.create_network_namespace(&name, true, false).unwrap();

    assert!(manager.paths().pid_record_path(&name).exists());
    assert!(manager.namespace_descriptor(&name).unwrap_err().is_not_found());
    assert!(manager.namespace_info(&name).is_empty());
}

#[test]
fn test_namespace_info_matches_holder() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = mock_manager(&MockSysClient::new(), tmp.path());
    let name = NamespaceName::new("dev1");

    let created = manager.create_network_namespace(&name, true, false).unwrap();

    let by_name = manager.namespace_info(&name);
    let by_pid = NamespaceInfo::for_pid(created.pid).unwrap();
    assert_eq!(by_name, by_pid);
}

#[test]
#[ignore] // Requires root
fn test_real_namespace_lifecycle() {
    if !is_root() {
        return;
    }

    let tmp = tempfile::tempdir().unwrap();
    let config = ManagerConfig::new()
        .with_root(tmp.path())
        .with_wait_for_holder(true);
    let manager = NetworkNamespaceManager::new(Arc::new(LinuxSysClient::new()), config).unwrap();
    let name = NamespaceName::new("nshold-test");

    let created = manager.create_network_namespace(&name, true, false).unwrap();
    assert!(created.report.is_clean());

    let fd = manager.namespace_descriptor(&name).unwrap();
    assert!(fd.as_raw_fd() >= 0);

    let own = NamespaceInfo::current().unwrap();
    let holder = manager.namespace_info(&name);
    assert!(holder.net.is_some());
    assert_ne!(holder.net, own.net);

    // Switch in a single-threaded child; setns(CLONE_NEWNS) refuses
    // multi-threaded callers.
    match unsafe { nix::unistd::fork() }.unwrap() {
        nix::unistd::ForkResult::Child => {
            let ok = manager.switch_namespace(&name).is_ok()
                && NamespaceInfo::current().map(|i| i.net).ok() == Some(holder.net.clone());
            std::process::exit(i32::from(!ok));
        }
        nix::unistd::ForkResult::Parent { child } => {
            let status = nix::sys::wait::waitpid(child, None).unwrap();
            assert_eq!(status, nix::sys::wait::WaitStatus::Exited(child, 0));
        }
    }

    let _ = nix::sys::signal::kill(created.pid.as_nix_pid(), nix::sys::signal::Signal::SIGKILL);
}
